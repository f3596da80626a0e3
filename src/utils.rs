//! Utility functions and helpers

use crate::error::{Result, RequestError};
use std::path::PathBuf;
use url::Url;


/// URL validation and parsing utilities
pub struct UrlUtils;

impl UrlUtils {
    /// Parse an absolute http(s) URL.
    pub fn validate_url(input: &str) -> Result<Url> {
        let url = Url::parse(input)
            .map_err(|e| RequestError::InvalidUrl(format!("Invalid URL '{}': {}", input, e)))?;
        if url.host_str().is_none() {
            return Err(RequestError::InvalidUrl(format!(
                "Invalid URL '{}': missing host",
                input
            )));
        }
        Ok(url)
    }

    pub fn is_http(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }
}

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Expand tilde (~) in file paths
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        let Some(rest) = path.strip_prefix('~') else {
            return Ok(PathBuf::from(path));
        };
        let home_dir = dirs::home_dir()
            .ok_or_else(|| RequestError::Config("Cannot determine home directory".to_string()))?;
        Ok(home_dir.join(rest.trim_start_matches(['/', '\\'])))
    }
}

/// String utilities
pub struct StringUtils;

impl StringUtils {
    /// Split a `"Key: value"` header line.
    pub fn parse_header(input: &str) -> Result<(String, String)> {
        match input.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(RequestError::Config(format!(
                "Invalid header format: '{}'. Expected 'key: value'",
                input
            ))),
        }
    }
}
