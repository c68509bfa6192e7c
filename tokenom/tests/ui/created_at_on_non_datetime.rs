//! Compile-fail test: #[tokenizable(created_at)] on a non-DateTime field.

#[derive(tokenom::Tokenizable)]
#[tokenizable(service = "shop", collection = "items")]
struct Item {
    #[tokenizable(id)]
    id: Option<u64>,
    #[tokenizable(token)]
    token: Option<String>,
    #[tokenizable(created_at)]
    created_at: i64,
}

fn main() {}
