use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, ExprUnary, Fields, Ident, Lit, LitStr, Result, UnOp,
    meta::ParseNestedMeta,
};

use super::field::{FieldRole, ParsedField};

const DEFAULT_TOKEN_LENGTH: usize = 8;

pub(crate) struct ParsedEntity {
    name: Ident,
    service: LitStr,
    collection: LitStr,
    token_length: usize,
    fields: Vec<ParsedField>,
}

impl ParsedEntity {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let mut service = None;
        let mut collection = None;
        let mut token_length = None;

        for attr in &input.attrs {
            if attr.path().is_ident("tokenizable") {
                Self::parse_container_attr(attr, &mut service, &mut collection, &mut token_length)?;
            }
        }

        let service = service.ok_or_else(|| {
            Error::new(input.ident.span(), "Tokenizable requires #[tokenizable(service = \"...\")]")
        })?;
        let collection = collection.ok_or_else(|| {
            Error::new(input.ident.span(), "Tokenizable requires #[tokenizable(collection = \"...\")]")
        })?;

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.ident.span(), "Tokenizable requires named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "Tokenizable can only be derived for structs")),
        };

        let entity = Self {
            name: input.ident.clone(),
            service,
            collection,
            token_length: token_length.unwrap_or(DEFAULT_TOKEN_LENGTH),
            fields,
        };
        entity.require_single(FieldRole::Id, "id")?;
        entity.require_single(FieldRole::Token, "token")?;
        Ok(entity)
    }

    fn parse_container_attr(
        attr: &Attribute,
        service: &mut Option<LitStr>,
        collection: &mut Option<LitStr>,
        token_length: &mut Option<usize>,
    ) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("service") {
                if service.is_some() {
                    return Err(meta.error("service declared more than once"));
                }
                *service = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("collection") {
                if collection.is_some() {
                    return Err(meta.error("collection declared more than once"));
                }
                *collection = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("token_length") {
                let length = parse_token_length(&meta)?;
                if let Some(previous) = token_length {
                    return Err(meta.error(format!(
                        "token_length redefined from {previous} to {length}; declare it once"
                    )));
                }
                *token_length = Some(length);
            } else {
                return Err(meta.error("unknown tokenizable attribute; expected service, collection or token_length"));
            }
            Ok(())
        })
    }

    fn fields_with(&self, role: FieldRole) -> impl Iterator<Item = &ParsedField> {
        self.fields.iter().filter(move |field| field.role == Some(role))
    }

    fn field_with(&self, role: FieldRole) -> Option<&ParsedField> {
        self.fields_with(role).next()
    }

    fn require_single(&self, role: FieldRole, label: &str) -> Result<()> {
        let mut matches = self.fields_with(role);
        if matches.next().is_none() {
            return Err(Error::new(
                self.name.span(),
                format!("Tokenizable requires a field annotated with #[tokenizable({label})]"),
            ));
        }
        if let Some(extra) = matches.next() {
            return Err(Error::new(
                extra.ident.span(),
                format!("Tokenizable allows exactly one #[tokenizable({label})] field"),
            ));
        }
        Ok(())
    }

    fn emit_touch(&self, role: FieldRole, method: &str) -> TokenStream2 {
        let method = Ident::new(method, proc_macro2::Span::call_site());
        let Some(field) = self.field_with(role) else {
            return TokenStream2::new();
        };
        let ident = &field.ident;
        let assign = if field.optional {
            quote! { self.#ident = ::std::option::Option::Some(at); }
        } else {
            quote! { self.#ident = at; }
        };
        quote! {
            fn #method(&mut self, at: ::tokenom::chrono::DateTime<::tokenom::chrono::Utc>) {
                #assign
            }
        }
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let name = &self.name;
        let service = &self.service;
        let collection = &self.collection;
        let token_length = Literal::usize_suffixed(self.token_length);

        // Both fields were checked in from_input.
        let (Some(id_field), Some(token_field)) = (self.field_with(FieldRole::Id), self.field_with(FieldRole::Token))
        else {
            return Error::new(name.span(), "Tokenizable requires id and token fields").to_compile_error();
        };
        let id_ident = &id_field.ident;
        let token_ident = &token_field.ident;
        let token_field_lit = LitStr::new(&token_field.name, token_ident.span());

        let touch_created = self.emit_touch(FieldRole::CreatedAt, "touch_created");
        let touch_updated = self.emit_touch(FieldRole::UpdatedAt, "touch_updated");

        quote! {
            impl ::tokenom::types::Tokenizable for #name {
                const SERVICE: &'static str = #service;
                const COLLECTION: &'static str = #collection;

                fn descriptor() -> ::tokenom::types::TokenDescriptor {
                    static REGISTER: ::std::sync::Once = ::std::sync::Once::new();
                    const TOKEN_LENGTH: ::std::num::NonZeroUsize = match ::std::num::NonZeroUsize::new(#token_length) {
                        ::std::option::Option::Some(length) => length,
                        ::std::option::Option::None => panic!("token_length must be a positive number greater than 0"),
                    };

                    let descriptor = ::tokenom::types::TokenDescriptor {
                        service: #service.to_string(),
                        collection: #collection.to_string(),
                        token_field: #token_field_lit.to_string(),
                        token_config: ::tokenom::config::TokenConfig::from_byte_length(
                            ::tokenom::config::ByteLength::from_non_zero(TOKEN_LENGTH),
                        ),
                    };
                    REGISTER.call_once(|| {
                        ::tokenom::registry::register_descriptor(&descriptor);
                    });
                    descriptor
                }

                fn record_id(&self) -> ::std::option::Option<u64> {
                    self.#id_ident
                }

                fn set_record_id(&mut self, id: u64) {
                    self.#id_ident = ::std::option::Option::Some(id);
                }

                fn token(&self) -> ::std::option::Option<&str> {
                    self.#token_ident.as_deref()
                }

                fn set_token(&mut self, token: ::std::string::String) {
                    self.#token_ident = ::std::option::Option::Some(token);
                }

                #touch_created
                #touch_updated
            }
        }
    }
}

/// Reads `token_length = N`, rejecting anything but a positive integer literal.
fn parse_token_length(meta: &ParseNestedMeta) -> Result<usize> {
    let expr: Expr = meta.value()?.parse()?;
    let value = match &expr {
        Expr::Lit(ExprLit { lit: Lit::Int(int), .. }) => int.base10_parse::<i64>()?,
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr: inner,
            ..
        }) => match inner.as_ref() {
            Expr::Lit(ExprLit { lit: Lit::Int(int), .. }) => -int.base10_parse::<i64>()?,
            _ => return Err(meta.error("token_length must be an integer literal")),
        },
        _ => return Err(meta.error("token_length must be an integer literal")),
    };
    if value < 1 {
        return Err(meta.error("token_length must be a positive number greater than 0"));
    }
    usize::try_from(value).map_err(|_| meta.error("token_length is too large"))
}
