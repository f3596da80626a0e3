//! Request configuration and its defaults

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::options::TransferOptions;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; U; Linux i686; fr; rv:1.9.1.1) Gecko/20090715 Firefox/3.5.1";

const COOKIE_JAR_DIR: &str = "fluent-request";
const COOKIE_JAR_FILE: &str = "cookies.txt";

/// Default location of the persisted cookie jar.
///
/// Lives under the user's local data directory, or the temp dir when the
/// platform has none.
pub fn default_cookie_jar_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(COOKIE_JAR_DIR)
        .join(COOKIE_JAR_FILE)
}

/// POST payload: either a raw, already encoded string or a field mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFields {
    /// Sent verbatim, e.g. `"a=1&b=2"`
    Raw(String),
    /// Sent as `multipart/form-data`
    Form(BTreeMap<String, String>),
}

impl PostFields {
    pub fn is_empty(&self) -> bool {
        match self {
            PostFields::Raw(raw) => raw.is_empty(),
            PostFields::Form(fields) => fields.is_empty(),
        }
    }
}

impl From<&str> for PostFields {
    fn from(raw: &str) -> Self {
        PostFields::Raw(raw.to_string())
    }
}

impl From<String> for PostFields {
    fn from(raw: String) -> Self {
        PostFields::Raw(raw)
    }
}

impl From<BTreeMap<String, String>> for PostFields {
    fn from(fields: BTreeMap<String, String>) -> Self {
        PostFields::Form(fields)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PostFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PostFields::Form(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Readable stream shared between the request and the transfer options.
///
/// Clones point at the same underlying reader, so a stream consumed by one
/// transfer stays consumed.
#[derive(Clone)]
pub struct PutStream(Arc<Mutex<Box<dyn Read + Send>>>);

impl PutStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        PutStream(Arc::new(Mutex::new(Box::new(reader))))
    }
}

impl Read for PutStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut reader = self
            .0
            .lock()
            .map_err(|_| io::Error::other("upload stream lock poisoned"))?;
        reader.read(buf)
    }
}

impl PartialEq for PutStream {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PutStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PutStream(..)")
    }
}

/// PUT payload: the stream to upload and its declared size in bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PutPayload {
    pub stream: PutStream,
    pub length: u64,
}

impl PutPayload {
    pub fn new(reader: impl Read + Send + 'static, length: u64) -> Self {
        Self {
            stream: PutStream::new(reader),
            length,
        }
    }
}

/// Request body mode, chosen by the last body setter called.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    None,
    Post(PostFields),
    Put(PutPayload),
}

/// Everything a request needs before it is handed to the transport
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub url: String,
    /// Always sent as the custom request method.
    pub method: String,
    pub timeout_secs: u64,
    pub max_redirects: u32,
    pub follow_redirects: bool,
    pub include_header: bool,
    pub no_body: bool,
    /// `"Key: value"` lines, in sending order.
    pub header_fields: Vec<String>,
    /// Raw `"k=v; k2=v2"` string.
    pub cookie_header: String,
    pub cookie_jar_path: PathBuf,
    pub user_agent: String,
    /// `"username:password"`
    pub credentials: Option<String>,
    pub body: RequestBody,
    pub extra_options: TransferOptions,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            url: String::new(),
            method: DEFAULT_METHOD.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            follow_redirects: true,
            include_header: false,
            no_body: false,
            header_fields: Vec::new(),
            cookie_header: String::new(),
            cookie_jar_path: default_cookie_jar_path(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: None,
            body: RequestBody::None,
            extra_options: TransferOptions::new(),
        }
    }
}
