//! Probe response rendering.
//!
//! Load balancers only look at the status line; headers and body are there
//! for humans poking the port with curl.

use chrono::Utc;

use crate::health::HttpStatus;

const SERVER_NAME: &str = concat!("hadb/", env!("CARGO_PKG_VERSION"));

/// A rendered probe response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: HttpStatus,
    pub message: String,
}

impl ProbeResponse {
    pub fn new(status: HttpStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Status line, headers, blank line and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let now = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        format!(
            "HTTP/1.1 {} {}\r\n\
             Date: {now}\r\n\
             Server: {SERVER_NAME}\r\n\
             Expires: {now}\r\n\
             Content-Type: text/html; charset=UTF-8\r\n\
             \r\n\
             {}\r\n",
            self.status.code(),
            self.status.reason(),
            self.message,
        )
        .into_bytes()
    }
}
