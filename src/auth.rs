//! HTTP authentication utilities

use crate::error::{Result, RequestError};
use base64::Engine;

/// Create basic auth header value
pub fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{}:{}", username, password);
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
    format!("Basic {}", encoded)
}

/// Parse `user:password`; a missing password is empty.
pub fn parse_user_pass(input: &str) -> Result<(String, String)> {
    if input.is_empty() {
        return Err(RequestError::Auth(
            "Empty credentials: expected username:password".to_string(),
        ));
    }
    match input.split_once(':') {
        Some((user, pass)) => Ok((user.to_string(), pass.to_string())),
        None => Ok((input.to_string(), String::new())),
    }
}

/// `Authorization` header value for a `user:password` string.
pub fn authorization_for(credentials: &str) -> Result<String> {
    let (user, pass) = parse_user_pass(credentials)?;
    Ok(basic_auth(&user, &pass))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_credentials() {
        assert_eq!(basic_auth("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn parse_user_pass_splits_on_first_colon() {
        assert_eq!(
            parse_user_pass("user:pa:ss").expect("parsed"),
            ("user".to_string(), "pa:ss".to_string())
        );
        assert_eq!(
            parse_user_pass("user").expect("parsed"),
            ("user".to_string(), String::new())
        );
    }

    #[test]
    fn parse_user_pass_allows_empty_user_but_not_empty_input() {
        assert_eq!(
            parse_user_pass(":pass").expect("parsed"),
            (String::new(), "pass".to_string())
        );
        assert!(matches!(parse_user_pass(""), Err(RequestError::Auth(_))));
    }

    #[test]
    fn authorization_for_builds_header() {
        assert_eq!(
            authorization_for("user:pass").expect("header"),
            "Basic dXNlcjpwYXNz"
        );
    }
}
