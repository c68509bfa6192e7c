use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod parsed;

use parsed::ParsedEntity;

/// Derives `tokenom::types::Tokenizable`.
///
/// ```text
/// #[derive(Tokenizable, Serialize, Deserialize)]
/// #[tokenizable(service = "shop", collection = "products", token_length = 12)]
/// struct Product {
///     #[tokenizable(id)]
///     id: Option<u64>,
///     #[tokenizable(token)]
///     token: Option<String>,
///     title: String,
/// }
/// ```
///
/// `token_length` defaults to 8 and must be a positive integer.
#[proc_macro_derive(Tokenizable, attributes(tokenizable))]
pub fn derive_tokenizable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
