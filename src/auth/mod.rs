use axum::http::{header::AUTHORIZATION, HeaderMap};


/// Pull the key out of `Authorization: Bearer <key>`.
///
/// The scheme is matched case-insensitively and the key is trimmed.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, TokenError> {
    let value = headers.get(AUTHORIZATION).ok_or(TokenError::Missing)?;
    let value = value.to_str().map_err(|_| TokenError::InvalidFormat)?;
    parse_bearer_token(value)
}

/// Check the request carries the shared API key.
///
/// `expected = None` means no key is configured and every request passes.
pub fn verify_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), TokenError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let token = extract_bearer_token(headers)?;
    if token == expected {
        Ok(())
    } else {
        Err(TokenError::Mismatch)
    }
}

fn parse_bearer_token(header_value: &str) -> Result<String, TokenError> {
    let Some((scheme, token)) = header_value.split_once(' ') else {
        return Err(TokenError::InvalidFormat);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Empty);
    }

    Ok(token.to_string())
}

/// Why a request failed the API key check
#[derive(Debug, PartialEq, Clone)]
pub enum TokenError {
    Missing,
    /// Not "Bearer <key>", or not valid header text
    InvalidFormat,
    Empty,
    /// Well-formed token that does not match the configured key
    Mismatch,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Missing => write!(f, "no Authorization header"),
            TokenError::InvalidFormat => write!(f, "Authorization header is not a bearer token"),
            TokenError::Empty => write!(f, "bearer token is empty"),
            TokenError::Mismatch => write!(f, "API key does not match"),
        }
    }
}

impl std::error::Error for TokenError {}
