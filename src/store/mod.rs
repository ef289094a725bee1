//! Data access
//!
//! Every query the HTTP layer needs lives here. Writes that touch more than
//! one row run inside a single transaction; dropping the transaction without
//! committing rolls it back.

use serde::{Deserialize, Deserializer};

use crate::error::{AppError, AppResult};

pub mod funcionario;
pub mod lookup;
pub mod usuario;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates. Use with `#[serde(default)]`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Trim a required text field and check its length
pub(crate) fn required_text(value: &str, field: &str, max_chars: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} é obrigatório", field)));
    }
    if value.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{} não pode ter mais de {} caracteres",
            field, max_chars
        )));
    }
    Ok(value.to_string())
}

/// Trim an optional text field; blank becomes `None`
pub(crate) fn optional_text(
    value: Option<String>,
    field: &str,
    max_chars: usize,
) -> AppResult<Option<String>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(v, field, max_chars).map(Some),
    }
}

/// Optional e-mail; blank becomes `None`, anything else must look like an address
pub(crate) fn normalize_email(value: Option<String>, max_chars: usize) -> AppResult<Option<String>> {
    match optional_text(value, "E-mail", max_chars)? {
        Some(email) if !looks_like_email(&email) => {
            Err(AppError::Validation("E-mail inválido".to_string()))
        }
        other => Ok(other),
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// Lowercased `LIKE` pattern matching `text` anywhere, with `\` as escape
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Requested sort key from an `ordering` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering<'a> {
    pub field: &'a str,
    pub descending: bool,
}

/// Parse `field` or `-field`, keeping only fields in `allowed`.
/// Only the first comma-separated key is used; anything unknown means
/// the default order.
pub(crate) fn parse_ordering<'a>(raw: Option<&str>, allowed: &[&'a str]) -> Option<Ordering<'a>> {
    let key = raw?.split(',').next()?.trim();
    let (name, descending) = match key.strip_prefix('-') {
        Some(name) => (name, true),
        None => (key, false),
    };
    allowed
        .iter()
        .copied()
        .find(|field| *field == name)
        .map(|field| Ordering { field, descending })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        email: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.email, None);

        let null: Patch = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(null.email, Some(None));

        let set: Patch = serde_json::from_str(r#"{"email": "a@b.com"}"#).unwrap();
        assert_eq!(set.email, Some(Some("a@b.com".to_string())));
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("  Vendas ", "Nome", 100).unwrap(), "Vendas");
        assert!(matches!(required_text("   ", "Nome", 100), Err(AppError::Validation(_))));
        assert!(required_text("ção", "Nome", 3).is_ok());
        assert!(required_text("ramal", "Ramal", 4).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(None, "Ramal", 20).unwrap(), None);
        assert_eq!(optional_text(Some("  ".into()), "Ramal", 20).unwrap(), None);
        assert_eq!(
            optional_text(Some(" 7223 ".into()), "Ramal", 20).unwrap(),
            Some("7223".to_string())
        );
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("maria@empresa.com.br"));
        assert!(!looks_like_email("maria"));
        assert!(!looks_like_email("@empresa.com"));
        assert!(!looks_like_email("maria@empresa"));
        assert!(!looks_like_email("ma ria@empresa.com"));
        assert!(!looks_like_email("a@b@c.com"));

        assert_eq!(normalize_email(Some(" ".into()), 200).unwrap(), None);
        assert!(matches!(
            normalize_email(Some("sem-arroba".into()), 200),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("50%_a\\b"), "%50\\%\\_a\\\\b%");
        assert_eq!(contains_pattern("Maria"), "%maria%");
    }

    #[test]
    fn test_parse_ordering() {
        let allowed = ["nome", "ramal"];
        assert_eq!(
            parse_ordering(Some("-ramal"), &allowed),
            Some(Ordering { field: "ramal", descending: true })
        );
        assert_eq!(
            parse_ordering(Some("nome,-ramal"), &allowed),
            Some(Ordering { field: "nome", descending: false })
        );
        assert_eq!(parse_ordering(Some("email"), &allowed), None);
        assert_eq!(parse_ordering(Some(""), &allowed), None);
        assert_eq!(parse_ordering(None, &allowed), None);
    }
}
