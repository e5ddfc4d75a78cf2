//! Probe request parsing.
//!
//! A request is a single line shaped like an HTTP request line,
//! `GET db1 HTTP/1.0`; the second whitespace-separated token names the target.
//! Nothing else in the request is interpreted.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Upper bound on the request line; anything longer is cut off.
pub const MAX_REQUEST_LINE: u64 = 4096;

/// Extract the target identifier from a request line.
pub fn target_id(line: &str) -> Option<&str> {
    line.split_whitespace().nth(1)
}

/// Read the first line from `stream`. Empty on EOF or a read error.
pub async fn read_request_line<R>(stream: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream.take(MAX_REQUEST_LINE));
    let mut line = String::new();
    if let Err(e) = reader.read_line(&mut line).await {
        tracing::debug!(error = %e, "Failed to read request line");
        line.clear();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_token_is_target() {
        assert_eq!(target_id("GET db1 HTTP/1.0\r\n"), Some("db1"));
        assert_eq!(target_id("OPTIONS   pg-main   HTTP/1.1"), Some("pg-main"));
        assert_eq!(target_id("db1"), None);
        assert_eq!(target_id(""), None);
        assert_eq!(target_id("   \r\n"), None);
    }

    #[tokio::test]
    async fn reads_only_first_line() {
        let input: &[u8] = b"GET db1 HTTP/1.0\r\nHost: lb\r\n\r\n";
        let line = read_request_line(input).await;
        assert_eq!(line, "GET db1 HTTP/1.0\r\n");
    }

    #[tokio::test]
    async fn eof_yields_empty_line() {
        let input: &[u8] = b"";
        assert_eq!(read_request_line(input).await, "");
    }

    #[tokio::test]
    async fn invalid_utf8_yields_empty_line() {
        let input: &[u8] = b"GET \xff\xfe HTTP/1.0\n";
        assert_eq!(read_request_line(input).await, "");
    }
}
