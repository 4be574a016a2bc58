use axum::http::HeaderMap;

/// Authentication failures at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Token <t>` header was supplied.
    MissingToken,
    /// A token was supplied but does not match.
    InvalidToken,
}

/// Returns the Authorization header value if it starts with `Token`.
fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?.trim();
    if value.starts_with("Token") {
        Some(value)
    } else {
        None
    }
}

/// Token from `Authorization: Token <t>`, if present.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let authorization = authorization_header(headers)?;
    authorization.split_once(' ').map(|(_, token)| token)
}

/// Enforce the `RequiresOwner` ACL against the configured owner token.
pub fn require_owner(owner_token: &str, headers: &HeaderMap) -> Result<(), AuthError> {
    match token_from_headers(headers) {
        None => Err(AuthError::MissingToken),
        Some(token) if token == owner_token => Ok(()),
        Some(_) => Err(AuthError::InvalidToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token_after_prefix() {
        let headers = headers_with("Token 34jk45df98");
        assert_eq!(token_from_headers(&headers), Some("34jk45df98"));
    }

    #[test]
    fn rejects_other_schemes() {
        let headers = headers_with("Bearer 34jk45df98");
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn missing_header_yields_no_token() {
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn require_owner_distinguishes_missing_from_invalid() {
        assert_eq!(
            require_owner("secret", &HeaderMap::new()),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            require_owner("secret", &headers_with("Token wrong")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            require_owner("secret", &headers_with("Token secret")),
            Ok(())
        );
    }
}
