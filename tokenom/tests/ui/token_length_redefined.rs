//! Compile-fail test: token_length declared twice.

#[derive(tokenom::Tokenizable)]
#[tokenizable(service = "shop", collection = "items", token_length = 8, token_length = 9)]
struct Item {
    #[tokenizable(id)]
    id: Option<u64>,
    #[tokenizable(token)]
    token: Option<String>,
}

fn main() {}
