//! Compile-fail test: token_length of zero.

#[derive(tokenom::Tokenizable)]
#[tokenizable(service = "shop", collection = "items", token_length = 0)]
struct Item {
    #[tokenizable(id)]
    id: Option<u64>,
    #[tokenizable(token)]
    token: Option<String>,
}

fn main() {}
