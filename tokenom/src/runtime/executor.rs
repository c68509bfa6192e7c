use std::borrow::Cow;

use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::RepoError,
    runtime::{
        commands::MutationCommand,
        scripts::{RECORD_CREATE_SCRIPT, RECORD_UPDATE_SCRIPT, TOKEN_BACKFILL_SCRIPT},
    },
};

/// Runs `command` through its Lua script and maps script-level errors onto [`RepoError`].
pub async fn execute_command<C>(conn: &mut C, command: &MutationCommand) -> Result<Value, RepoError>
where
    C: ConnectionLike + Send,
{
    let script = match command {
        MutationCommand::CreateRecord(_) => &*RECORD_CREATE_SCRIPT,
        MutationCommand::UpdateRecord(_) => &*RECORD_UPDATE_SCRIPT,
        MutationCommand::BackfillTokens(_) => &*TOKEN_BACKFILL_SCRIPT,
    };

    let payload = serde_json::to_string(command).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to serialize command: {err}")),
    })?;

    let mut invocation = script.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await.map_err(RepoError::from)?;

    let value: Value = serde_json::from_str(&raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to parse lua response: {err}")),
    })?;

    match value.get("error") {
        None => Ok(value),
        Some(error) => Err(script_error(error.as_str(), &value)),
    }
}

fn script_error(code: Option<&str>, value: &Value) -> RepoError {
    let entity_id = value.get("entity_id").and_then(|v| v.as_str()).map(|s| s.to_string());
    match code {
        Some("entity_not_found") => RepoError::NotFound { entity_id },
        Some("unique_constraint_violation") => {
            let fields = string_list(value.get("fields"));
            let values = string_list(value.get("values"));
            let existing_entity_id = value
                .get("existing_entity_id")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            RepoError::UniqueConstraintViolation {
                fields,
                values,
                existing_entity_id,
            }
        }
        Some(code @ ("token_required" | "token_already_assigned" | "duplicate_token_in_batch")) => {
            RepoError::Rejected {
                code: code.to_string(),
                message: format!("record {}", entity_id.unwrap_or_default()),
            }
        }
        Some(other) => RepoError::Other {
            message: Cow::Owned(other.to_string()),
        },
        None => RepoError::Other {
            message: Cow::Borrowed("lua_error"),
        },
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
