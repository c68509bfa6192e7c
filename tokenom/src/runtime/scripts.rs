use redis::Script;
use std::sync::LazyLock;

pub const RECORD_CREATE_SCRIPT_BODY: &str = include_str!("../../lua/record_create.lua");
pub const RECORD_UPDATE_SCRIPT_BODY: &str = include_str!("../../lua/record_update.lua");
pub const TOKEN_BACKFILL_SCRIPT_BODY: &str = include_str!("../../lua/token_backfill.lua");

pub static RECORD_CREATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(RECORD_CREATE_SCRIPT_BODY));
pub static RECORD_UPDATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(RECORD_UPDATE_SCRIPT_BODY));
pub static TOKEN_BACKFILL_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(TOKEN_BACKFILL_SCRIPT_BODY));
