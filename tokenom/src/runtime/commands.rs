use serde::Serialize;

use crate::types::TokenAssignment;

/// Payload handed to one of the Lua mutation scripts, serialized as
/// `{"<variant>": {...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationCommand {
    CreateRecord(RecordCreate),
    UpdateRecord(RecordUpdate),
    BackfillTokens(TokenBackfill),
}

/// Key names shared by every command for one record type.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionKeys {
    /// Record keys are `key_prefix` followed by the id.
    pub key_prefix: String,
    pub untokenized_key: String,
    pub unique_key: String,
    pub token_field: String,
}

/// Inserts a record under an id taken from `sequence_key`.
#[derive(Debug, Serialize)]
pub struct RecordCreate {
    #[serde(flatten)]
    pub keys: CollectionKeys,
    pub sequence_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub payload_json: String,
}

/// Replaces an existing record; refuses to clear an assigned token.
#[derive(Debug, Serialize)]
pub struct RecordUpdate {
    #[serde(flatten)]
    pub keys: CollectionKeys,
    pub key: String,
    pub entity_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub payload_json: String,
}

/// Sets the token of every listed record in one script invocation.
#[derive(Debug, Serialize)]
pub struct TokenBackfill {
    #[serde(flatten)]
    pub keys: CollectionKeys,
    pub assignments: Vec<TokenAssignment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys() -> CollectionKeys {
        CollectionKeys {
            key_prefix: "tok:shop:products:".to_string(),
            untokenized_key: "tok:shop:products:untokenized".to_string(),
            unique_key: "tok:shop:products:unique:token".to_string(),
            token_field: "token".to_string(),
        }
    }

    #[test]
    fn backfill_payload_shape() {
        let command = MutationCommand::BackfillTokens(TokenBackfill {
            keys: keys(),
            assignments: vec![TokenAssignment::new(3, "abc")],
        });
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(
            value,
            json!({
                "backfill_tokens": {
                    "key_prefix": "tok:shop:products:",
                    "untokenized_key": "tok:shop:products:untokenized",
                    "unique_key": "tok:shop:products:unique:token",
                    "token_field": "token",
                    "assignments": [{ "id": 3, "token": "abc" }],
                }
            })
        );
    }

    #[test]
    fn create_payload_omits_missing_token() {
        let command = MutationCommand::CreateRecord(RecordCreate {
            keys: keys(),
            sequence_key: "tok:shop:products:seq".to_string(),
            token: None,
            payload_json: "{}".to_string(),
        });
        let value = serde_json::to_value(&command).unwrap();
        assert!(value["create_record"].get("token").is_none());
        assert_eq!(value["create_record"]["sequence_key"], "tok:shop:products:seq");
    }
}
