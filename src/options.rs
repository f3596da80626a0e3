//! Transfer options handed to a transport
//!
//! Options are keyed by a closed enumeration of the settings a transport
//! understands, with typed values. `OptionKey::Custom` is the escape hatch
//! for transport-specific extensions; transports that do not recognise a
//! custom key ignore it.

use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};

use crate::config::{PostFields, PutStream};

/// Recognised transfer settings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    /// Target URL (text)
    Url,
    /// `User-Agent` header (text)
    UserAgent,
    /// Cookie file read before the transfer (path)
    CookieFile,
    /// Cookie file written after the transfer (path)
    CookieJar,
    /// Whole-transfer timeout in seconds (integer)
    Timeout,
    /// Connection timeout in seconds (integer)
    ConnectTimeout,
    /// Maximum redirects to follow (integer)
    MaxRedirects,
    /// Follow `Location` headers (flag)
    FollowLocation,
    /// Prepend the response header block to the returned text (flag)
    Header,
    /// Do not transfer the response body (flag)
    NoBody,
    /// Method sent on the request line (text)
    CustomRequest,
    /// Return the body instead of writing it to stdout (flag)
    ReturnTransfer,
    /// Extra `"Key: value"` header lines (lines)
    HttpHeader,
    /// Literal `Cookie` header value (text)
    Cookie,
    /// `"user:password"` credentials (text)
    UserPwd,
    /// Plain POST (flag)
    Post,
    /// POST payload (fields)
    PostFields,
    /// Upload the input stream with PUT (flag)
    Upload,
    /// Upload source (stream)
    InFile,
    /// Upload size in bytes (integer)
    InFileSize,
    /// Verify the peer certificate (flag)
    SslVerifyPeer,
    /// Override the port of the URL (integer)
    Port,
    /// Proxy URL (text)
    Proxy,
    /// `Referer` header (text)
    Referer,
    /// Transport-specific extension
    Custom(String),
}

/// Typed option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Text(String),
    Integer(u64),
    Flag(bool),
    Lines(Vec<String>),
    Path(PathBuf),
    Fields(PostFields),
    Stream(PutStream),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<u32> for OptionValue {
    fn from(value: u32) -> Self {
        OptionValue::Integer(u64::from(value))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Flag(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::Lines(value)
    }
}

impl From<PathBuf> for OptionValue {
    fn from(value: PathBuf) -> Self {
        OptionValue::Path(value)
    }
}

impl From<PostFields> for OptionValue {
    fn from(value: PostFields) -> Self {
        OptionValue::Fields(value)
    }
}

impl From<PutStream> for OptionValue {
    fn from(value: PutStream) -> Self {
        OptionValue::Stream(value)
    }
}

/// Ordered option map; inserting an existing key replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOptions {
    entries: BTreeMap<OptionKey, OptionValue>,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: OptionKey, value: impl Into<OptionValue>) -> &mut Self {
        self.entries.insert(key, value.into());
        self
    }

    /// Merge `other` into `self` key by key; keys in `other` win.
    pub fn merge(&mut self, other: TransferOptions) -> &mut Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, key: &OptionKey) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &OptionKey) -> Option<OptionValue> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &OptionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, OptionKey, OptionValue> {
        self.entries.iter()
    }

    pub fn text(&self, key: &OptionKey) -> Option<&str> {
        match self.get(key) {
            Some(OptionValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, key: &OptionKey) -> Option<u64> {
        match self.get(key) {
            Some(OptionValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn flag(&self, key: &OptionKey) -> Option<bool> {
        match self.get(key) {
            Some(OptionValue::Flag(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn lines(&self, key: &OptionKey) -> Option<&[String]> {
        match self.get(key) {
            Some(OptionValue::Lines(value)) => Some(value),
            _ => None,
        }
    }

    pub fn path(&self, key: &OptionKey) -> Option<&Path> {
        match self.get(key) {
            Some(OptionValue::Path(value)) => Some(value),
            _ => None,
        }
    }

    pub fn fields(&self, key: &OptionKey) -> Option<&PostFields> {
        match self.get(key) {
            Some(OptionValue::Fields(value)) => Some(value),
            _ => None,
        }
    }

    pub fn stream(&self, key: &OptionKey) -> Option<&PutStream> {
        match self.get(key) {
            Some(OptionValue::Stream(value)) => Some(value),
            _ => None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for TransferOptions
where
    K: Into<OptionKey>,
    V: Into<OptionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = TransferOptions::new();
        for (key, value) in iter {
            options.set(key.into(), value);
        }
        options
    }
}

impl<'a> IntoIterator for &'a TransferOptions {
    type Item = (&'a OptionKey, &'a OptionValue);
    type IntoIter = btree_map::Iter<'a, OptionKey, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
