//! fluent-request - a chainable builder around a single HTTP transfer
//!
//! Configure a [`Request`] with setters, call [`Request::execute`], then read
//! the status snapshot and response text. Transfers run synchronously on a
//! reqwest client owned by the request, with a Netscape-format cookie jar
//! persisted between transfers.

pub mod auth;
pub mod config;
pub mod cookie_jar;
pub mod error;
pub mod logging;
pub mod options;
pub mod request;
pub mod response;
pub mod transport;
pub mod utils;

pub use config::{PostFields, PutPayload, RequestBody, RequestConfig};
pub use error::{RequestError, Result};
pub use options::{OptionKey, OptionValue, TransferOptions};
pub use request::Request;
pub use transport::{ReqwestTransport, TransferInfo, Transport};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
