// src/middleware/i18n.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};

use crate::config::AppState;

// Extrator de idioma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl<S> FromRequestParts<S> for Locale
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(primary_language);

        let lang = match lang {
            Some(lang) => lang,
            None => AppState::from_ref(state).i18n_store.default_lang().to_string(),
        };

        Ok(Locale(lang))
    }
}

// "es-CO,es;q=0.9" -> "es"
fn primary_language(header_str: &str) -> Option<String> {
    accept_language::parse(header_str).first().map(|tag_string| {
        tag_string
            .split('-')
            .next()
            .unwrap_or(tag_string)
            .to_ascii_lowercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_language() {
        assert_eq!(primary_language("en-US,en;q=0.9").as_deref(), Some("en"));
        assert_eq!(primary_language("es;q=0.5, en;q=0.8").as_deref(), Some("en"));
        assert_eq!(primary_language("").as_deref(), None);
    }
}
