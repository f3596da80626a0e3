//! Transfer engine abstraction
//!
//! A [`Transport`] is the capability a request drives: it takes a bulk set
//! of options, performs one synchronous transfer, exposes metadata about the
//! last transfer and can be released.

use serde::Serialize;

use crate::error::Result;
use crate::options::TransferOptions;

pub mod codes;
pub mod reqwest;

pub use self::reqwest::ReqwestTransport;

/// Transfer engine driven by a request
pub trait Transport {
    /// Replace the options used by the next transfer.
    fn apply(&mut self, options: TransferOptions);

    /// Perform one transfer and return the response text.
    ///
    /// Failures are reported as `RequestError::Transfer` carrying one of the
    /// codes in [`codes`].
    fn perform(&mut self) -> Result<String>;

    /// Metadata about the most recent transfer, successful or not.
    fn info(&self) -> TransferInfo;

    /// Release the engine. Must be safe to call more than once.
    fn close(&mut self);
}

/// Status snapshot of one transfer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferInfo {
    /// Last URL used, after redirects
    pub url: String,
    /// `0` when no response was received
    pub http_code: u16,
    pub content_type: Option<String>,
    /// Bytes in the received header block
    pub header_size: u64,
    /// Bytes in the sent header block
    pub request_size: u64,
    pub size_download: u64,
    pub size_upload: u64,
    pub download_content_length: Option<u64>,
    pub redirect_count: u32,
    /// Seconds
    pub total_time: f64,
    pub primary_ip: Option<String>,
    pub primary_port: Option<u16>,
}

impl TransferInfo {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
