//! Transfer error codes
//!
//! Numbering follows curl's, so callers already familiar with those codes
//! can match on them.

pub const UNSUPPORTED_PROTOCOL: u32 = 1;
pub const FAILED_INIT: u32 = 2;
pub const URL_MALFORMAT: u32 = 3;
pub const COULDNT_RESOLVE_PROXY: u32 = 5;
pub const COULDNT_CONNECT: u32 = 7;
pub const WRITE_ERROR: u32 = 23;
pub const READ_ERROR: u32 = 26;
pub const OPERATION_TIMEDOUT: u32 = 28;
pub const BAD_FUNCTION_ARGUMENT: u32 = 43;
pub const TOO_MANY_REDIRECTS: u32 = 47;
pub const RECV_ERROR: u32 = 56;
pub const BAD_CONTENT_ENCODING: u32 = 61;

pub fn code_for_reqwest_error(err: &::reqwest::Error) -> u32 {
    if err.is_timeout() {
        return OPERATION_TIMEDOUT;
    }
    if err.is_redirect() {
        return TOO_MANY_REDIRECTS;
    }
    if err.is_connect() {
        return COULDNT_CONNECT;
    }
    if err.is_builder() {
        return URL_MALFORMAT;
    }
    if err.is_decode() {
        return BAD_CONTENT_ENCODING;
    }
    RECV_ERROR
}

/// Human readable description of a transfer error, including its source chain.
pub fn describe_reqwest_error(err: &::reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
