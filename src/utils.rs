use std::sync::{Arc, OnceLock};

use axum::{
    async_trait,
    extract::{rejection::PathRejection, FromRef, FromRequestParts},
    http::request::Parts,
    response::Html,
};
use minijinja::context;
use regex::Regex;
use tracing::error;
use url::Url;

use crate::app::AppState;

#[macro_export]
macro_rules! render_template_with_context {
    ($state:expr, $template_name:expr $(,)?) => {
        Html($state.render_template($template_name, context! {}).await)
    };
    ($state:expr, $template_name:expr, $context:expr $(,)?) => {
        Html($state.render_template($template_name, $context).await)
    };
}

// A wrapper for `axum::extract::Path` that can render a 404 page if the path is rejected.
pub struct Path<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Path<T>
where
    Arc<AppState>: FromRef<S>,
    // derive the `FromRequestParts` implementation for `axum::extract::Path` for the type `T`.
    axum::extract::Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    T: Send,
    S: Send + Sync,
{
    type Rejection = Html<String>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                error!("parse path rejection: {:?}", rejection);
                // get the app state.
                let state = Arc::<AppState>::from_ref(state);
                // render the template.
                Err(render_template_with_context!(
                    state,
                    "error.html",
                    context! {
                        title => "404",
                        message => "Oops, it seems like you've stumbled upon a URL that doesn't exist...",
                    },
                ))
            }
        }
    }
}

// Number of pages needed to show `total` items, `per_page` at a time.
pub fn page_count(total: u32, per_page: u32) -> u32 {
    total.div_ceil(per_page)
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

// A link is only accepted when it parses as an absolute http(s) URL.
pub fn is_valid_url(url: &str) -> bool {
    if url.len() > 255 {
        return false;
    }
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_email, is_valid_url, page_count};

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(500, 15), 34);
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("visitor@example.com"));
        assert!(is_valid_email("first.last@mail.example.co"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("no-tld@example"));
        assert!(!is_valid_email(&format!("{}@example.com", "a".repeat(254))));
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/path?query=1"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url(&format!(
            "https://example.com/{}",
            "a".repeat(256)
        )));
    }
}
