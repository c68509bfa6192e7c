use syn::{Attribute, Error, Field, GenericArgument, Ident, PathArguments, Result, Type, spanned::Spanned};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldRole {
    Id,
    Token,
    CreatedAt,
    UpdatedAt,
}

pub(crate) struct ParsedField {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) role: Option<FieldRole>,
    /// Whether the declared type is `Option<_>`.
    pub(crate) optional: bool,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Tokenizable requires named fields"))?;
        let name = ident.to_string();

        let mut role = None;
        for attr in &field.attrs {
            if attr.path().is_ident("tokenizable") {
                Self::parse_field_attr(attr, &mut role)?;
            }
        }

        match role {
            Some(FieldRole::Id) if !is_option_of(&field.ty, "u64") => {
                return Err(Error::new(field.ty.span(), "#[tokenizable(id)] field must be Option<u64>"));
            }
            Some(FieldRole::Token) if !is_option_of(&field.ty, "String") => {
                return Err(Error::new(
                    field.ty.span(),
                    "#[tokenizable(token)] field must be Option<String>",
                ));
            }
            Some(role @ (FieldRole::CreatedAt | FieldRole::UpdatedAt)) if !is_datetime(&field.ty) => {
                let label = if role == FieldRole::CreatedAt { "created_at" } else { "updated_at" };
                return Err(Error::new(
                    field.ty.span(),
                    format!("#[tokenizable({label})] field must be DateTime<Utc> or Option<DateTime<Utc>>"),
                ));
            }
            _ => {}
        }

        Ok(Self {
            ident,
            name,
            role,
            optional: option_inner(&field.ty).is_some(),
        })
    }

    fn parse_field_attr(attr: &Attribute, role: &mut Option<FieldRole>) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            let next = if meta.path.is_ident("id") {
                FieldRole::Id
            } else if meta.path.is_ident("token") {
                FieldRole::Token
            } else if meta.path.is_ident("created_at") {
                FieldRole::CreatedAt
            } else if meta.path.is_ident("updated_at") {
                FieldRole::UpdatedAt
            } else {
                return Err(meta.error("unknown tokenizable field attribute; expected id, token, created_at or updated_at"));
            };
            if role.is_some() {
                return Err(meta.error("a field can carry only one tokenizable role"));
            }
            *role = Some(next);
            Ok(())
        })
    }
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_option_of(ty: &Type, name: &str) -> bool {
    match option_inner(ty) {
        Some(Type::Path(inner)) => inner.path.segments.last().is_some_and(|segment| segment.ident == name),
        _ => false,
    }
}

fn is_datetime(ty: &Type) -> bool {
    let ty = option_inner(ty).unwrap_or(ty);
    match ty {
        Type::Path(path) => path.path.segments.last().is_some_and(|segment| segment.ident == "DateTime"),
        _ => false,
    }
}
