// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 framing for the UNIX socket transport.
//!
//! One request and one response per connection; bodies carry JSON and are
//! delimited by `Content-Length`. This is deliberately the smallest codec
//! that satisfies the wire contract, since both peers are this runtime.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

use crate::error::IpcError;

/// Maximum message size (200 MB)
pub const MAX_MESSAGE_SIZE: usize = 200 * 1024 * 1024;

const MAX_HEADER_LINE: usize = 8 * 1024;

/// A parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    /// Decoded query parameters in order of appearance.
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            body: Vec::new(),
        }
    }

    /// First value for a query parameter, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response: status code plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn with_body(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The reason text for this response: the body if non-empty, else the
    /// canonical reason phrase.
    pub fn reason(&self) -> &str {
        if self.body.is_empty() {
            reason_phrase(self.status)
        } else {
            &self.body
        }
    }
}

/// Canonical reason phrase for the status codes this runtime emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Read one request from the stream. EOF before the request line maps to
/// [`IpcError::PipeDisconnected`].
pub async fn read_request<R>(reader: &mut R) -> Result<HttpRequest, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = read_line(reader).await?;
    if request_line.is_empty() {
        return Err(IpcError::PipeDisconnected);
    }

    let mut parts = request_line.split(' ');
    let method = parts
        .next()
        .filter(|m| !m.is_empty())
        .ok_or_else(|| IpcError::Malformed("empty request line".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| IpcError::Malformed(format!("no request target in '{request_line}'")))?;
    let version = parts
        .next()
        .ok_or_else(|| IpcError::Malformed(format!("no HTTP version in '{request_line}'")))?;
    if !version.starts_with("HTTP/1.") {
        return Err(IpcError::Malformed(format!(
            "unsupported protocol version '{version}'"
        )));
    }

    let content_length = read_headers(reader).await?;
    let body = read_body(reader, content_length).await?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, parse_query(query)),
        None => (target, Vec::new()),
    };

    Ok(HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        query,
        body,
    })
}

/// Write one request. The query string is composed from `req.query`.
pub async fn write_request<W>(writer: &mut W, req: &HttpRequest) -> Result<(), IpcError>
where
    W: AsyncWriteExt + Unpin,
{
    if req.body.len() > MAX_MESSAGE_SIZE {
        return Err(IpcError::MessageTooLarge {
            size: req.body.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut target = req.path.clone();
    for (i, (key, value)) in req.query.iter().enumerate() {
        target.push(if i == 0 { '?' } else { '&' });
        target.push_str(&percent_encode(key));
        target.push('=');
        target.push_str(&percent_encode(value));
    }

    let head = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        req.method,
        target,
        req.body.len()
    );
    writer
        .write_all(head.as_bytes())
        .await
        .map_err(IpcError::from_io)?;
    writer
        .write_all(&req.body)
        .await
        .map_err(IpcError::from_io)?;
    writer.flush().await.map_err(IpcError::from_io)?;
    Ok(())
}

/// Read one response from the stream.
pub async fn read_response<R>(reader: &mut R) -> Result<HttpResponse, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    let status_line = read_line(reader).await?;
    if status_line.is_empty() {
        return Err(IpcError::PipeDisconnected);
    }

    let mut parts = status_line.split(' ');
    let version = parts
        .next()
        .ok_or_else(|| IpcError::Malformed("empty status line".to_string()))?;
    if !version.starts_with("HTTP/1.") {
        return Err(IpcError::Malformed(format!(
            "unsupported protocol version '{version}'"
        )));
    }
    let status: u16 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| IpcError::Malformed(format!("no status code in '{status_line}'")))?;

    let content_length = read_headers(reader).await?;
    let body = read_body(reader, content_length).await?;
    let body = String::from_utf8(body)
        .map_err(|_| IpcError::Malformed("response body is not UTF-8".to_string()))?;

    Ok(HttpResponse { status, body })
}

/// Write one response with `Content-Length` framing.
pub async fn write_response<W>(writer: &mut W, resp: &HttpResponse) -> Result<(), IpcError>
where
    W: AsyncWriteExt + Unpin,
{
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        resp.status,
        reason_phrase(resp.status),
        resp.body.len()
    );
    writer
        .write_all(head.as_bytes())
        .await
        .map_err(IpcError::from_io)?;
    writer
        .write_all(resp.body.as_bytes())
        .await
        .map_err(IpcError::from_io)?;
    writer.flush().await.map_err(IpcError::from_io)?;
    Ok(())
}

/// Read a CRLF-terminated line, without the terminator.
async fn read_line<R>(reader: &mut R) -> Result<String, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await.map_err(IpcError::from_io)?;
    if n > MAX_HEADER_LINE {
        return Err(IpcError::Malformed("header line too long".to_string()));
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

/// Consume headers until the blank line, returning `Content-Length` if set.
async fn read_headers<R>(reader: &mut R) -> Result<Option<usize>, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length = None;
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            return Ok(content_length);
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let length: usize = value.trim().parse().map_err(|_| {
                    IpcError::Malformed(format!("bad Content-Length '{}'", value.trim()))
                })?;
                if length > MAX_MESSAGE_SIZE {
                    return Err(IpcError::MessageTooLarge {
                        size: length,
                        max: MAX_MESSAGE_SIZE,
                    });
                }
                content_length = Some(length);
            }
        }
    }
}

async fn read_body<R>(reader: &mut R, content_length: Option<usize>) -> Result<Vec<u8>, IpcError>
where
    R: AsyncBufRead + Unpin,
{
    match content_length {
        Some(length) => {
            let mut body = vec![0u8; length];
            reader
                .read_exact(&mut body)
                .await
                .map_err(IpcError::from_io)?;
            Ok(body)
        }
        None => Ok(Vec::new()),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (percent_decode(key), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

/// Decode `%XX` escapes and `+` as space. Malformed escapes pass through.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes.get(i + 1..i + 3);
                match hex.and_then(|h| u8::from_str_radix(&String::from_utf8_lossy(h), 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encode characters that cannot appear raw in a query component.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
