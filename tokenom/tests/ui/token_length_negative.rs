//! Compile-fail test: negative token_length.

#[derive(tokenom::Tokenizable)]
#[tokenizable(service = "shop", collection = "items", token_length = -3)]
struct Item {
    #[tokenizable(id)]
    id: Option<u64>,
    #[tokenizable(token)]
    token: Option<String>,
}

fn main() {}
