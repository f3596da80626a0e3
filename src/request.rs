//! Chainable request builder and executor
//!
//! A [`Request`] owns its configuration and one transport. Setters assign a
//! single field and return the request for chaining; [`Request::execute`]
//! folds the configuration into transfer options, runs one transfer and
//! keeps the status snapshot and response text.
//!
//! ```no_run
//! use fluent_request::Request;
//!
//! let mut request = Request::new("https://example.com/login")?;
//! request
//!     .set_request("POST")
//!     .set_post([("user", "alice"), ("password", "secret")].into_iter().collect::<fluent_request::PostFields>())
//!     .set_timeout(10);
//! let body = request.execute()?.to_string();
//! # Ok::<(), fluent_request::RequestError>(())
//! ```

use std::fmt;
use std::io::{self, Read};
use std::path::Path;

use crate::config::{PostFields, PutPayload, RequestBody, RequestConfig};
use crate::error::Result;
use crate::options::{OptionKey, TransferOptions};
use crate::transport::{ReqwestTransport, TransferInfo, Transport};
use crate::utils::FileUtils;


/// Request builder bound to one transport
pub struct Request<T: Transport = ReqwestTransport> {
    config: RequestConfig,
    transport: T,
    last_status: Option<TransferInfo>,
    last_response_body: String,
}

impl Request<ReqwestTransport> {
    /// Create a request with default settings on the reqwest engine.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::from_config(RequestConfig::new(url))
    }

    /// Create a request from explicit initial settings on the reqwest engine.
    pub fn from_config(config: RequestConfig) -> Result<Self> {
        let transport = ReqwestTransport::init()?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Request<T> {
    pub fn with_transport(config: RequestConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            last_status: None,
            last_response_body: String::new(),
        }
    }

    /// Merge transport options; a key set again replaces its earlier value.
    ///
    /// Options derived from the request's own fields are applied after these
    /// and win on conflict.
    pub fn set_extra_options(&mut self, options: TransferOptions) -> &mut Self {
        self.config.extra_options.merge(options);
        self
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.config.url = url.into();
        self
    }

    /// Cookies sent with the request, e.g. `"fruit=apple; colour=red"`.
    pub fn set_cookie(&mut self, cookie: impl Into<String>) -> &mut Self {
        self.config.cookie_header = cookie.into();
        self
    }

    /// Cookie file read before and written after each transfer.
    pub fn set_cookie_jar(&mut self, path: &str) -> Result<&mut Self> {
        self.config.cookie_jar_path = FileUtils::expand_path(path)?;
        Ok(self)
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Whole-transfer timeout in seconds; `0` disables it.
    pub fn set_timeout(&mut self, seconds: u64) -> &mut Self {
        self.config.timeout_secs = seconds;
        self
    }

    pub fn set_max_redirects(&mut self, max_redirects: u32) -> &mut Self {
        self.config.max_redirects = max_redirects;
        self
    }

    pub fn set_follow(&mut self, follow: bool) -> &mut Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Prepend the response status line and headers to the response text.
    ///
    /// When redirects are followed, only the final response's header block
    /// is included.
    pub fn set_include_header(&mut self, include_header: bool) -> &mut Self {
        self.config.include_header = include_header;
        self
    }

    pub fn set_no_body(&mut self, no_body: bool) -> &mut Self {
        self.config.no_body = no_body;
        self
    }

    /// `"Key: value"` lines, sent in order.
    pub fn set_header_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.header_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Credentials formatted as `"username:password"`.
    pub fn set_pass(&mut self, credentials: impl Into<String>) -> &mut Self {
        self.config.credentials = Some(credentials.into());
        self
    }

    /// Method sent on the request line.
    pub fn set_request(&mut self, method: impl Into<String>) -> &mut Self {
        self.config.method = method.into();
        self
    }

    pub fn set_post(&mut self, fields: impl Into<PostFields>) -> &mut Self {
        self.config.body = RequestBody::Post(fields.into());
        self
    }

    /// Upload `length` bytes read from `stream`.
    pub fn set_put(&mut self, stream: impl Read + Send + 'static, length: u64) -> &mut Self {
        self.config.body = RequestBody::Put(PutPayload::new(stream, length));
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn cookie_header(&self) -> &str {
        &self.config.cookie_header
    }

    pub fn cookie_jar_path(&self) -> &Path {
        &self.config.cookie_jar_path
    }

    /// Raw contents of the cookie jar; empty until something has been written.
    pub fn cookie_file(&self) -> Result<String> {
        match std::fs::read(&self.config.cookie_jar_path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    pub fn timeout(&self) -> u64 {
        self.config.timeout_secs
    }

    pub fn max_redirects(&self) -> u32 {
        self.config.max_redirects
    }

    pub fn follow(&self) -> bool {
        self.config.follow_redirects
    }

    pub fn include_header(&self) -> bool {
        self.config.include_header
    }

    pub fn no_body(&self) -> bool {
        self.config.no_body
    }

    pub fn header_fields(&self) -> &[String] {
        &self.config.header_fields
    }

    pub fn pass(&self) -> Option<&str> {
        self.config.credentials.as_deref()
    }

    pub fn request(&self) -> &str {
        &self.config.method
    }

    /// Extra options, POST fields and PUT payload, in that order.
    pub fn options(&self) -> (&TransferOptions, Option<&PostFields>, Option<&PutPayload>) {
        let (post, put) = match &self.config.body {
            RequestBody::None => (None, None),
            RequestBody::Post(fields) => (Some(fields), None),
            RequestBody::Put(payload) => (None, Some(payload)),
        };
        (&self.config.extra_options, post, put)
    }

    /// Status snapshot of the last successful transfer.
    pub fn status(&self) -> Option<&TransferInfo> {
        self.last_status.as_ref()
    }

    /// Response text of the last successful transfer.
    pub fn response(&self) -> &str {
        &self.last_response_body
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fold the configuration into the options handed to the transport.
    pub fn build_options(&self) -> TransferOptions {
        let config = &self.config;
        let mut options = config.extra_options.clone();

        options
            .set(OptionKey::Url, config.url.as_str())
            .set(OptionKey::UserAgent, config.user_agent.as_str())
            .set(OptionKey::CookieJar, config.cookie_jar_path.clone())
            .set(OptionKey::CookieFile, config.cookie_jar_path.clone())
            .set(OptionKey::Timeout, config.timeout_secs)
            .set(OptionKey::MaxRedirects, config.max_redirects)
            .set(OptionKey::FollowLocation, config.follow_redirects)
            .set(OptionKey::Header, config.include_header)
            .set(OptionKey::NoBody, config.no_body)
            .set(OptionKey::CustomRequest, config.method.as_str())
            .set(OptionKey::ReturnTransfer, true);

        if !config.header_fields.is_empty() {
            options.set(OptionKey::HttpHeader, config.header_fields.clone());
        }
        if !config.cookie_header.is_empty() {
            options.set(OptionKey::Cookie, config.cookie_header.as_str());
        }
        if let Some(credentials) = &config.credentials {
            options.set(OptionKey::UserPwd, credentials.as_str());
        }

        match &config.body {
            RequestBody::None => {}
            RequestBody::Post(fields) => {
                if !fields.is_empty() {
                    options.set(OptionKey::PostFields, fields.clone());
                }
            }
            RequestBody::Put(payload) => {
                options
                    .set(OptionKey::Upload, true)
                    .set(OptionKey::InFile, payload.stream.clone())
                    .set(OptionKey::InFileSize, payload.length);
            }
        }
        if config.method == "POST" {
            options.set(OptionKey::Post, true);
        }
        options
    }

    /// Run one transfer with the current configuration.
    ///
    /// On failure the previous status and response text are kept; metadata
    /// about the failed attempt is available from [`Transport::info`].
    pub fn execute(&mut self) -> Result<&mut Self> {
        let options = self.build_options();
        log::debug!(
            "Executing {} {} with options {:?}",
            self.config.method,
            self.config.url,
            options.iter().map(|(key, _)| key).collect::<Vec<_>>()
        );

        self.transport.apply(options);
        let body = match self.transport.perform() {
            Ok(body) => body,
            Err(err) => {
                log::debug!("Transfer to {} failed: {}", self.config.url, err);
                return Err(err);
            }
        };

        let status = self.transport.info();
        log::info!(
            "{} {} -> {} ({} bytes)",
            self.config.method,
            status.url,
            status.http_code,
            body.len()
        );
        self.last_response_body = body;
        self.last_status = Some(status);
        Ok(self)
    }

    /// Release the transport. Safe to call repeatedly; also runs on drop.
    pub fn close(&mut self) {
        self.transport.close();
    }
}

impl<T: Transport> Drop for Request<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

impl<T: Transport> fmt::Display for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.last_response_body)
    }
}

impl<T: Transport> fmt::Debug for Request<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("config", &self.config)
            .field("last_status", &self.last_status)
            .field("last_response_body", &self.last_response_body)
            .finish_non_exhaustive()
    }
}
