//! Transfer engine backed by reqwest
//!
//! Each transfer builds a client from the applied options and drives it on a
//! private current-thread tokio runtime, so callers see a blocking API.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ::reqwest::cookie::CookieStore;
use ::reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, REFERER, USER_AGENT,
};
use ::reqwest::redirect::Policy;
use ::reqwest::{multipart, Client, Method, Proxy};
use tokio::runtime::{Builder, Handle, Runtime};
use url::Url;

use super::{codes, TransferInfo, Transport};
use crate::auth;
use crate::config::PostFields;
use crate::cookie_jar::CookieJar;
use crate::error::{RequestError, Result};
use crate::options::{OptionKey, TransferOptions};
use crate::response::{decode_body_with_charset, format_response_headers};
use crate::utils::{StringUtils, UrlUtils};

const DEFAULT_MAX_REDIRECTS: u32 = 30;
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Default transfer engine
pub struct ReqwestTransport {
    runtime: Option<Runtime>,
    options: TransferOptions,
    info: TransferInfo,
}

impl ReqwestTransport {
    /// Create the engine and its runtime. No network activity happens here.
    pub fn init() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                RequestError::Initialization(format!("Failed to create async runtime: {}", e))
            })?;
        Ok(Self {
            runtime: Some(runtime),
            options: TransferOptions::new(),
            info: TransferInfo::default(),
        })
    }

    pub fn is_open(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }
}

impl Transport for ReqwestTransport {
    fn apply(&mut self, options: TransferOptions) {
        self.options = options;
    }

    fn perform(&mut self) -> Result<String> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            RequestError::transfer(codes::FAILED_INIT, "Transfer handle has been released")
        })?;

        self.info = TransferInfo {
            url: self
                .options
                .text(&OptionKey::Url)
                .unwrap_or_default()
                .to_string(),
            ..TransferInfo::default()
        };
        let started = Instant::now();

        let plan = TransferPlan::from_options(&self.options)?;
        let return_transfer = plan.return_transfer;
        let (jar, save_path) = plan.open_cookie_jar();

        let info = &mut self.info;
        let outcome = if Handle::try_current().is_ok() {
            // block_on panics on a thread that is already inside a runtime.
            std::thread::scope(|scope| {
                scope
                    .spawn(|| runtime.block_on(run_transfer(plan, jar.clone(), info)))
                    .join()
                    .unwrap_or_else(|_| {
                        Err(RequestError::transfer(
                            codes::FAILED_INIT,
                            "Transfer thread panicked",
                        ))
                    })
            })
        } else {
            runtime.block_on(run_transfer(plan, jar.clone(), info))
        };
        self.info.total_time = started.elapsed().as_secs_f64();

        if let (Some(jar), Some(path)) = (jar, save_path) {
            if let Err(err) = jar.save(&path) {
                log::warn!("Failed to write cookie jar {:?}: {}", path, err);
            }
        }

        let text = outcome?;
        if return_transfer {
            Ok(text)
        } else {
            io::stdout()
                .write_all(text.as_bytes())
                .map_err(|e| RequestError::transfer(codes::WRITE_ERROR, e.to_string()))?;
            Ok(String::new())
        }
    }

    fn info(&self) -> TransferInfo {
        self.info.clone()
    }

    fn close(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            log::debug!("Transfer handle released");
        }
    }
}

impl Drop for ReqwestTransport {
    fn drop(&mut self) {
        self.close();
    }
}

enum PlannedBody {
    Empty,
    Raw(String),
    Form(BTreeMap<String, String>),
    Upload(Vec<u8>),
}

impl PlannedBody {
    fn upload_size(&self) -> u64 {
        match self {
            PlannedBody::Raw(raw) => raw.len() as u64,
            PlannedBody::Upload(bytes) => bytes.len() as u64,
            PlannedBody::Empty | PlannedBody::Form(_) => 0,
        }
    }
}

/// Options resolved into what a single reqwest transfer needs
struct TransferPlan {
    url: Url,
    method: Method,
    headers: HeaderMap,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    follow: bool,
    max_redirects: u32,
    verify_peer: bool,
    proxy: Option<String>,
    include_header: bool,
    no_body: bool,
    return_transfer: bool,
    body: PlannedBody,
    cookie: Option<String>,
    cookie_file: Option<PathBuf>,
    cookie_jar: Option<PathBuf>,
}

impl TransferPlan {
    fn from_options(options: &TransferOptions) -> Result<Self> {
        for (key, _) in options {
            if let OptionKey::Custom(name) = key {
                log::warn!("Ignoring unsupported transfer option '{}'", name);
            }
        }

        let url = resolve_url(options)?;
        let method = resolve_method(options)?;
        let headers = resolve_headers(options)?;
        let body = resolve_body(options)?;

        Ok(TransferPlan {
            url,
            method,
            headers,
            timeout: seconds(options.integer(&OptionKey::Timeout)),
            connect_timeout: seconds(options.integer(&OptionKey::ConnectTimeout)),
            follow: options.flag(&OptionKey::FollowLocation).unwrap_or(false),
            max_redirects: options
                .integer(&OptionKey::MaxRedirects)
                .map(|max| u32::try_from(max).unwrap_or(u32::MAX))
                .unwrap_or(DEFAULT_MAX_REDIRECTS),
            verify_peer: options.flag(&OptionKey::SslVerifyPeer).unwrap_or(true),
            proxy: non_empty(options.text(&OptionKey::Proxy)),
            include_header: options.flag(&OptionKey::Header).unwrap_or(false),
            no_body: options.flag(&OptionKey::NoBody).unwrap_or(false),
            return_transfer: options.flag(&OptionKey::ReturnTransfer).unwrap_or(false),
            body,
            cookie: non_empty(options.text(&OptionKey::Cookie)),
            cookie_file: options.path(&OptionKey::CookieFile).map(PathBuf::from),
            cookie_jar: options.path(&OptionKey::CookieJar).map(PathBuf::from),
        })
    }

    /// Jar used for this transfer and the path it is saved to afterwards.
    ///
    /// A cookie file that exists but cannot be read is never overwritten:
    /// the transfer runs with an empty jar and nothing is saved.
    fn open_cookie_jar(&self) -> (Option<Arc<CookieJar>>, Option<PathBuf>) {
        if self.cookie_file.is_none() && self.cookie_jar.is_none() {
            return (None, None);
        }
        let mut save_path = self.cookie_jar.clone();
        let jar = match &self.cookie_file {
            Some(path) => CookieJar::load(path).unwrap_or_else(|err| {
                log::warn!("Cannot read cookie file {:?}, cookies will not be saved: {}", path, err);
                save_path = None;
                CookieJar::new()
            }),
            None => CookieJar::new(),
        };
        (Some(Arc::new(jar)), save_path)
    }
}

/// Cookie provider for one transfer
///
/// Sends the explicit cookie string ahead of the jar's matches on every hop,
/// and records `Set-Cookie` headers into the jar.
struct TransferCookies {
    explicit: Option<String>,
    jar: Option<Arc<CookieJar>>,
}

impl CookieStore for TransferCookies {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if let Some(jar) = &self.jar {
            jar.set_cookies(cookie_headers, url);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let stored = self.jar.as_ref().and_then(|jar| jar.header_for(url));
        let value = match (&self.explicit, stored) {
            (Some(explicit), Some(stored)) => format!("{}; {}", explicit, stored),
            (Some(explicit), None) => explicit.clone(),
            (None, Some(stored)) => stored,
            (None, None) => return None,
        };
        HeaderValue::from_str(&value).ok()
    }
}

async fn run_transfer(
    plan: TransferPlan,
    jar: Option<Arc<CookieJar>>,
    info: &mut TransferInfo,
) -> Result<String> {
    let redirect_count = Arc::new(AtomicU32::new(0));
    let policy = if plan.follow {
        let max = plan.max_redirects as usize;
        let counter = Arc::clone(&redirect_count);
        Policy::custom(move |attempt| {
            let hops = attempt.previous().len();
            if hops > max {
                attempt.error(format!("Maximum ({}) redirects followed", max))
            } else {
                counter.store(hops as u32, Ordering::Relaxed);
                attempt.follow()
            }
        })
    } else {
        Policy::none()
    };

    let mut builder = Client::builder()
        .redirect(policy)
        .danger_accept_invalid_certs(!plan.verify_peer);
    if let Some(timeout) = plan.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(timeout) = plan.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(proxy) = &plan.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| {
            RequestError::transfer(codes::COULDNT_RESOLVE_PROXY, format!("Invalid proxy: {}", e))
        })?;
        builder = builder.proxy(proxy);
    }
    if let Some(explicit) = &plan.cookie {
        HeaderValue::from_str(explicit).map_err(|_| {
            RequestError::transfer(codes::BAD_FUNCTION_ARGUMENT, "Invalid cookie string")
        })?;
    }
    if plan.cookie.is_some() || jar.is_some() {
        builder = builder.cookie_provider(Arc::new(TransferCookies {
            explicit: plan.cookie.clone(),
            jar,
        }));
    }
    let client = builder.build().map_err(|e| {
        RequestError::transfer(codes::FAILED_INIT, codes::describe_reqwest_error(&e))
    })?;

    let headers = plan.headers;
    info.size_upload = plan.body.upload_size();
    let has_content_type = headers.contains_key(CONTENT_TYPE);
    let mut request = client
        .request(plan.method.clone(), plan.url.clone())
        .headers(headers);
    request = match plan.body {
        PlannedBody::Empty => request,
        PlannedBody::Raw(raw) if has_content_type => request.body(raw),
        PlannedBody::Raw(raw) => request.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(raw),
        PlannedBody::Form(fields) => {
            let form = fields
                .into_iter()
                .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value));
            request.multipart(form)
        }
        PlannedBody::Upload(bytes) => request.body(bytes),
    };
    let request = request.build().map_err(transfer_failure)?;
    info.request_size = request_header_size(&request);

    log::debug!("> {} {}", request.method(), request.url());
    let result = client.execute(request).await;
    info.redirect_count = redirect_count.load(Ordering::Relaxed);
    let response = result.map_err(transfer_failure)?;

    let status = response.status();
    let response_headers = response.headers().clone();
    let header_block = format_response_headers(response.version(), status, &response_headers);
    let content_type = response_headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    info.url = response.url().to_string();
    info.http_code = status.as_u16();
    info.header_size = header_block.len() as u64;
    info.download_content_length = response.content_length();
    info.content_type = content_type.clone();
    if let Some(addr) = response.remote_addr() {
        info.primary_ip = Some(addr.ip().to_string());
        info.primary_port = Some(addr.port());
    }
    log::debug!("< {} {}", status.as_u16(), info.url);

    let body = if plan.no_body {
        Vec::new()
    } else {
        response.bytes().await.map_err(transfer_failure)?.to_vec()
    };
    info.size_download = body.len() as u64;

    let mut text = String::new();
    if plan.include_header {
        text.push_str(&header_block);
    }
    text.push_str(&decode_body_with_charset(&body, content_type.as_deref()));
    Ok(text)
}

fn resolve_url(options: &TransferOptions) -> Result<Url> {
    let raw = options
        .text(&OptionKey::Url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RequestError::transfer(codes::URL_MALFORMAT, "No URL set"))?;
    let mut url = UrlUtils::validate_url(raw)
        .map_err(|e| RequestError::transfer(codes::URL_MALFORMAT, e.to_string()))?;
    if !UrlUtils::is_http(&url) {
        return Err(RequestError::transfer(
            codes::UNSUPPORTED_PROTOCOL,
            format!("Protocol \"{}\" not supported", url.scheme()),
        ));
    }
    if let Some(port) = options.integer(&OptionKey::Port) {
        let port = u16::try_from(port).map_err(|_| {
            RequestError::transfer(codes::URL_MALFORMAT, format!("Port {} out of range", port))
        })?;
        url.set_port(Some(port)).map_err(|_| {
            RequestError::transfer(codes::URL_MALFORMAT, format!("Cannot set port on {}", raw))
        })?;
    }
    Ok(url)
}

fn resolve_method(options: &TransferOptions) -> Result<Method> {
    if let Some(custom) = options.text(&OptionKey::CustomRequest).filter(|m| !m.is_empty()) {
        return Method::from_bytes(custom.as_bytes()).map_err(|_| {
            RequestError::transfer(
                codes::BAD_FUNCTION_ARGUMENT,
                format!("Invalid request method '{}'", custom),
            )
        });
    }
    let method = if options.flag(&OptionKey::Upload).unwrap_or(false) {
        Method::PUT
    } else if options.flag(&OptionKey::Post).unwrap_or(false)
        || options.fields(&OptionKey::PostFields).is_some()
    {
        Method::POST
    } else if options.flag(&OptionKey::NoBody).unwrap_or(false) {
        Method::HEAD
    } else {
        Method::GET
    };
    Ok(method)
}

fn resolve_headers(options: &TransferOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in options.lines(&OptionKey::HttpHeader).unwrap_or_default() {
        let parsed = StringUtils::parse_header(line).and_then(|(key, value)| {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| RequestError::Config(e.to_string()))?;
            let value =
                HeaderValue::from_str(&value).map_err(|e| RequestError::Config(e.to_string()))?;
            Ok((name, value))
        });
        match parsed {
            Ok((name, value)) => {
                headers.append(name, value);
            }
            Err(err) => log::warn!("Skipping header line '{}': {}", line, err),
        }
    }

    // Explicit header lines win over the dedicated options.
    let defaults = [
        (USER_AGENT, options.text(&OptionKey::UserAgent)),
        (REFERER, options.text(&OptionKey::Referer)),
    ];
    for (name, value) in defaults {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        if headers.contains_key(&name) {
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|_| {
            RequestError::transfer(
                codes::BAD_FUNCTION_ARGUMENT,
                format!("Invalid {} value", name),
            )
        })?;
        headers.insert(name, value);
    }

    if let Some(credentials) = options.text(&OptionKey::UserPwd).filter(|c| !c.is_empty()) {
        if !headers.contains_key(AUTHORIZATION) {
            let value = auth::authorization_for(credentials)
                .ok()
                .and_then(|header| HeaderValue::from_str(&header).ok())
                .ok_or_else(|| {
                    RequestError::transfer(codes::BAD_FUNCTION_ARGUMENT, "Invalid credentials")
                })?;
            headers.insert(AUTHORIZATION, value);
        }
    }
    Ok(headers)
}

fn resolve_body(options: &TransferOptions) -> Result<PlannedBody> {
    if options.flag(&OptionKey::Upload).unwrap_or(false) {
        let mut stream = options
            .stream(&OptionKey::InFile)
            .cloned()
            .ok_or_else(|| RequestError::transfer(codes::READ_ERROR, "No upload stream set"))?;
        let mut bytes = Vec::new();
        match options.integer(&OptionKey::InFileSize) {
            Some(expected) => {
                (&mut stream)
                    .take(expected)
                    .read_to_end(&mut bytes)
                    .map_err(|e| RequestError::transfer(codes::READ_ERROR, e.to_string()))?;
                if (bytes.len() as u64) < expected {
                    return Err(RequestError::transfer(
                        codes::READ_ERROR,
                        format!(
                            "Upload stream ended after {} of {} bytes",
                            bytes.len(),
                            expected
                        ),
                    ));
                }
            }
            None => {
                stream
                    .read_to_end(&mut bytes)
                    .map_err(|e| RequestError::transfer(codes::READ_ERROR, e.to_string()))?;
            }
        }
        return Ok(PlannedBody::Upload(bytes));
    }

    let body = match options.fields(&OptionKey::PostFields) {
        Some(PostFields::Raw(raw)) => PlannedBody::Raw(raw.clone()),
        Some(PostFields::Form(fields)) => PlannedBody::Form(fields.clone()),
        None if options.flag(&OptionKey::Post).unwrap_or(false) => {
            PlannedBody::Raw(String::new())
        }
        None => PlannedBody::Empty,
    };
    Ok(body)
}

fn request_header_size(request: &::reqwest::Request) -> u64 {
    let request_line = request.method().as_str().len() + request.url().path().len() + 12;
    let headers: usize = request
        .headers()
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum();
    (request_line + headers + 2) as u64
}

fn transfer_failure(err: ::reqwest::Error) -> RequestError {
    RequestError::transfer(
        codes::code_for_reqwest_error(&err),
        codes::describe_reqwest_error(&err),
    )
}

fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|secs| *secs > 0).map(Duration::from_secs)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
