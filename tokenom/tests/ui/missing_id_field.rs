//! Compile-fail test: no #[tokenizable(id)] field.

#[derive(tokenom::Tokenizable)]
#[tokenizable(service = "shop", collection = "items")]
struct Item {
    #[tokenizable(token)]
    token: Option<String>,
}

fn main() {}
