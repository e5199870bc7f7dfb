//! Incremental parser for CGI script output.
//!
//! # States
//! - AwaitingHeaders: buffer bytes until a blank line ends the header block
//! - Body: every further byte is body, passed through untouched
//!
//! # State Transitions
//! ```text
//! AwaitingHeaders → Body: blank line (CRLF or bare LF)
//! AwaitingHeaders → Body: a line that is not `key: value`; that line and
//!                         everything after it become the body
//! AwaitingHeaders → end of data: no header block at all; the whole output is
//!                         the body with status 200 OK
//! ```
//!
//! # Design Decisions
//! - One parser per request, fed chunk by chunk
//! - `Status` is a pseudo-header and never forwarded
//! - Header names keep the script's spelling; duplicates are kept
//! - Folded (continuation) header lines are not supported

use axum::http::{HeaderName, HeaderValue, StatusCode};
use thiserror::Error;

/// Errors the parser cannot recover from by falling back to a plain body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid Status header `{0}`")]
    InvalidStatus(String),
}

/// Status line and headers produced by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    /// Reason phrase; empty means the canonical reason for `status`.
    pub status_message: String,
    /// Header names keep the script's spelling.
    pub headers: Vec<(String, HeaderValue)>,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            status_message: "OK".to_string(),
            headers: Vec::new(),
        }
    }
}

/// A fully parsed script response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeaders,
    Body,
}

/// Push-based CGI output parser.
#[derive(Debug)]
pub struct ResponseParser {
    state: State,
    /// Raw bytes seen while awaiting headers.
    pending: Vec<u8>,
    /// Offset in `pending` of the first line not yet parsed.
    line_start: usize,
    /// Offset in `pending` up to which no newline was found.
    scan_from: usize,
    status: Option<String>,
    headers: Vec<(String, HeaderValue)>,
    head: ResponseHead,
    body: Vec<u8>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingHeaders,
            pending: Vec::new(),
            line_start: 0,
            scan_from: 0,
            status: None,
            headers: Vec::new(),
            head: ResponseHead::default(),
            body: Vec::new(),
        }
    }

    /// True once the header block has been consumed.
    pub fn headers_complete(&self) -> bool {
        self.state == State::Body
    }

    /// Bytes buffered so far, header block included.
    pub fn buffered_len(&self) -> usize {
        self.pending.len() + self.body.len()
    }

    /// Feed the next chunk of script output.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ParseError> {
        match self.state {
            State::Body => {
                self.body.extend_from_slice(chunk);
                Ok(())
            }
            State::AwaitingHeaders => {
                self.pending.extend_from_slice(chunk);
                self.parse_lines()
            }
        }
    }

    /// Signal end of output and take the response.
    pub fn finish(self) -> CgiResponse {
        match self.state {
            State::Body => CgiResponse {
                head: self.head,
                body: self.body,
            },
            // Never saw a header block terminator: all of it is body.
            State::AwaitingHeaders => CgiResponse {
                head: ResponseHead::default(),
                body: self.pending,
            },
        }
    }

    fn parse_lines(&mut self) -> Result<(), ParseError> {
        loop {
            let unscanned = &self.pending[self.scan_from..];
            let Some(offset) = unscanned.iter().position(|&b| b == b'\n') else {
                // Bytes already searched are never searched again.
                self.scan_from = self.pending.len();
                return Ok(());
            };
            let line_end = self.scan_from + offset;
            let next_line = line_end + 1;
            self.scan_from = next_line;

            let mut line = &self.pending[self.line_start..line_end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }

            if line.is_empty() {
                return self.enter_body(next_line);
            }

            match parse_header_line(line) {
                Some((key, value)) => {
                    if key.eq_ignore_ascii_case("status") {
                        self.status = Some(String::from_utf8_lossy(value.as_bytes()).into_owned());
                    } else {
                        self.headers.push((key, value));
                    }
                    self.line_start = next_line;
                }
                None => {
                    tracing::debug!(
                        line = %String::from_utf8_lossy(line),
                        "Malformed CGI header line, treating rest as body"
                    );
                    return self.enter_body(self.line_start);
                }
            }
        }
    }

    /// Commit the parsed headers; bytes from `body_start` on are body.
    fn enter_body(&mut self, body_start: usize) -> Result<(), ParseError> {
        let pending = std::mem::take(&mut self.pending);
        self.body = pending[body_start..].to_vec();
        self.state = State::Body;

        if let Some(raw) = self.status.take() {
            let (status, message) = parse_status(&raw)?;
            self.head.status = status;
            self.head.status_message = message;
        }
        self.head.headers = std::mem::take(&mut self.headers);
        Ok(())
    }
}

/// Split `key: value`. The key must be a valid header name and the trimmed
/// value a valid header value; values may carry non-UTF-8 obs-text.
fn parse_header_line(line: &[u8]) -> Option<(String, HeaderValue)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (key, value) = (&line[..colon], line[colon + 1..].trim_ascii());

    let name = HeaderName::from_bytes(key).ok()?;
    let value = HeaderValue::from_bytes(value).ok()?;

    // A valid header name is ASCII, so this keeps the script's spelling.
    let key = std::str::from_utf8(key).map_or_else(|_| name.to_string(), str::to_string);
    Some((key, value))
}

/// `201 Created` → (201, "Created"); message words are joined by one space.
fn parse_status(raw: &str) -> Result<(StatusCode, String), ParseError> {
    let mut tokens = raw.split_whitespace();
    let status = tokens
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| ParseError::InvalidStatus(raw.to_string()))?;
    Ok((status, tokens.collect::<Vec<_>>().join(" ")))
}
