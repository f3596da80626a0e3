//! Persistent cookie jar
//!
//! Cookies are kept in the Netscape cookie-file format, one cookie per line:
//!
//! ```text
//! domain  include-subdomains  path  secure  expires  name  value
//! ```
//!
//! A domain prefixed with `#HttpOnly_` marks an HTTP-only cookie. An
//! `expires` of `0` is a session cookie.
//!
//! The jar is loaded before a transfer, receives every `Set-Cookie` header
//! the transfer sees (redirect hops included, through reqwest's
//! [`CookieStore`] hook) and is written back afterwards.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::{NaiveDateTime, Utc};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use url::Url;

use crate::error::Result;


const FILE_HEADER: &str = "# Netscape HTTP Cookie File\n\
# This file was generated by fluent-request. Edit at your own risk.\n\n";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// One cookie as stored in the jar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    /// Host or domain, without a leading dot
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp, `0` for a session cookie
    pub expires: i64,
    pub name: String,
    pub value: String,
}

impl StoredCookie {
    /// Parse one line of a cookie file. Comments and malformed lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None => (line, false),
        };
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<&str> = line.splitn(7, '\t').collect();
        let [domain, subdomains, path, secure, expires, name, value] = fields.as_slice() else {
            return None;
        };

        Some(StoredCookie {
            domain: domain.trim_start_matches('.').to_ascii_lowercase(),
            include_subdomains: subdomains.eq_ignore_ascii_case("TRUE"),
            path: path.to_string(),
            secure: secure.eq_ignore_ascii_case("TRUE"),
            http_only,
            expires: expires.parse().ok()?,
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Render the cookie as a cookie-file line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let prefix = if self.http_only { HTTP_ONLY_PREFIX } else { "" };
        let dot = if self.include_subdomains { "." } else { "" };
        format!(
            "{}{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
            prefix,
            dot,
            self.domain,
            netscape_bool(self.include_subdomains),
            self.path,
            netscape_bool(self.secure),
            self.expires,
            self.name,
            self.value
        )
    }

    /// Build a cookie from a `Set-Cookie` header received from `url`.
    ///
    /// Returns `None` when the header is malformed or its `Domain` attribute
    /// does not cover the responding host. A cookie whose expiry is not after
    /// `now` is returned as-is; storing it removes any previous value.
    pub fn from_set_cookie(header: &str, url: &Url, now: i64) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = StoredCookie {
            domain: host.clone(),
            include_subdomains: false,
            path: default_path(url),
            secure: false,
            http_only: false,
            expires: 0,
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
        };
        let mut max_age = None;

        for attribute in parts {
            let (key, val) = match attribute.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attribute.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "domain" if !val.is_empty() => {
                    let domain = val.trim_start_matches('.').to_ascii_lowercase();
                    if !domain_matches(&host, &domain) {
                        log::debug!("Rejecting cookie {} for {}: domain {}", name, host, domain);
                        return None;
                    }
                    cookie.domain = domain;
                    cookie.include_subdomains = true;
                }
                "path" if val.starts_with('/') => cookie.path = val.to_string(),
                "expires" => {
                    if let Some(expires) = parse_cookie_date(val) {
                        cookie.expires = expires;
                    }
                }
                "max-age" => max_age = val.parse::<i64>().ok(),
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        if let Some(seconds) = max_age {
            cookie.expires = if seconds <= 0 { now - 1 } else { now + seconds };
        }
        Some(cookie)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    /// Whether this cookie should be sent to `url`.
    pub fn matches(&self, url: &Url, now: i64) -> bool {
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let domain_ok = if self.include_subdomains {
            domain_matches(&host, &self.domain)
        } else {
            host == self.domain
        };
        domain_ok && path_matches(url.path(), &self.path)
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name && self.domain == other.domain && self.path == other.path
    }
}

/// Cookie jar shared with the transfer engine
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a jar from disk. A missing file yields an empty jar.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; lines that no longer
    /// parse are skipped.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => {
                let jar = Self::parse(&String::from_utf8_lossy(&bytes));
                log::debug!("Loaded {} cookies from {:?}", jar.len(), path);
                Ok(jar)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Parse cookie-file contents, skipping comments and malformed lines.
    pub fn parse(contents: &str) -> Self {
        let mut cookies = Vec::new();
        for line in contents.lines() {
            let trimmed = line.trim();
            let comment = trimmed.starts_with('#') && !trimmed.starts_with(HTTP_ONLY_PREFIX);
            if trimmed.is_empty() || comment {
                continue;
            }
            match StoredCookie::parse_line(line) {
                Some(cookie) => cookies.push(cookie),
                None => log::warn!("Skipping malformed cookie line: {}", line),
            }
        }
        Self {
            cookies: RwLock::new(cookies),
        }
    }

    /// Render the jar in cookie-file format, dropping expired cookies.
    pub fn render(&self) -> String {
        let now = Utc::now().timestamp();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::from(FILE_HEADER);
        for cookie in cookies.iter().filter(|c| !c.is_expired(now)) {
            out.push_str(&cookie.to_line());
            out.push('\n');
        }
        out
    }

    /// Write the jar to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render())?;
        log::debug!("Saved {} cookies to {:?}", self.len(), path);
        Ok(())
    }

    /// Record one `Set-Cookie` header received from `url`.
    pub fn store(&self, url: &Url, set_cookie: &str) {
        let now = Utc::now().timestamp();
        let Some(cookie) = StoredCookie::from_set_cookie(set_cookie, url, now) else {
            return;
        };
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|existing| !existing.same_slot(&cookie));
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
    }

    /// `Cookie` header value for `url`, if any cookie matches.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let now = Utc::now().timestamp();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<&StoredCookie> =
            cookies.iter().filter(|c| c.matches(url, now)).collect();
        if matching.is_empty() {
            return None;
        }
        // Longer paths first
        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn snapshot(&self) -> Vec<StoredCookie> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for header in cookie_headers {
            match header.to_str() {
                Ok(value) => self.store(url, value),
                Err(_) => log::warn!("Ignoring non-UTF-8 Set-Cookie header from {}", url),
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|value| HeaderValue::from_str(&value).ok())
    }
}

fn netscape_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

/// Parse an `Expires` attribute into a unix timestamp.
fn parse_cookie_date(value: &str) -> Option<i64> {
    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        return Some(date.timestamp());
    }
    // Older servers send "Wdy, DD-Mon-YYYY HH:MM:SS GMT"
    NaiveDateTime::parse_from_str(value, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|date| date.and_utc().timestamp())
}
