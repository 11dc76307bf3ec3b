//! Minimal HTTP/1.1 framing for the target's serving loop. The target only
//! needs request sizes and keep-alive boundaries; anything the framing
//! cannot parse ends the connection and never reaches accounting.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on one request's header block.
const MAX_HEADER_BYTES: usize = 1024 * 1024;
/// Read granularity for header and body draining.
const CHUNK_BYTES: usize = 4096;

const OK_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 18\r\n\r\nArbalest target OK";
const OK_RESPONSE_CLOSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Type: text/plain\r\nContent-Length: 18\r\n\r\nArbalest target OK";

/// Parsed request envelope; the body itself is drained, not kept.
#[derive(Debug, Clone, Copy)]
pub(super) struct HttpRequest {
    /// Sum of all header field name/value byte lengths.
    pub header_bytes: u64,
    /// Declared `Content-Length`, zero when absent.
    pub content_length: u64,
    /// Peer asked for `Connection: close`.
    pub close: bool,
}

impl HttpRequest {
    /// Accounted request size: header bytes plus declared content length.
    pub const fn size(&self) -> u64 {
        self.header_bytes.saturating_add(self.content_length)
    }
}

/// Reads one request off the stream, draining its body so the next request
/// starts on a frame boundary. Returns `Ok(None)` on a clean end of stream
/// between requests.
pub(super) async fn read_request<S>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
) -> std::io::Result<Option<HttpRequest>>
where
    S: AsyncRead + Unpin,
{
    let header_end = loop {
        if let Some(pos) = find_header_end(buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Err(invalid_data("request headers too large"));
        }
        let mut chunk = [0u8; CHUNK_BYTES];
        let bytes = stream.read(&mut chunk).await?;
        if bytes == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(invalid_data("connection closed mid-request"));
        }
        buffer.extend_from_slice(chunk.get(..bytes).unwrap_or_default());
    };

    let request = parse_header_block(buffer.get(..header_end).unwrap_or_default())?;

    let block_end = header_end.saturating_add(4).min(buffer.len());
    buffer.drain(..block_end);
    drain_body(stream, buffer, request.content_length).await?;

    Ok(Some(request))
}

fn parse_header_block(block: &[u8]) -> std::io::Result<HttpRequest> {
    let header_text = std::str::from_utf8(block)
        .map_err(|err| invalid_data(format!("invalid request encoding: {}", err)))?;
    let mut lines = header_text.split("\r\n");

    let request_line = lines.next().ok_or_else(|| invalid_data("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next().ok_or_else(|| invalid_data("missing method"))?;
    let _path = parts.next().ok_or_else(|| invalid_data("missing path"))?;
    let version = parts.next().ok_or_else(|| invalid_data("missing version"))?;
    if !version.starts_with("HTTP/") {
        return Err(invalid_data("malformed request line"));
    }

    let mut header_bytes = 0u64;
    let mut content_length = 0u64;
    let mut close = false;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(invalid_data("malformed header"));
        };
        let name = name.trim();
        let value = value.trim();
        header_bytes = header_bytes
            .saturating_add(name.len() as u64)
            .saturating_add(value.len() as u64);
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|err| invalid_data(format!("invalid content-length: {}", err)))?;
        } else if name.eq_ignore_ascii_case("connection") && value.eq_ignore_ascii_case("close") {
            close = true;
        }
    }

    Ok(HttpRequest {
        header_bytes,
        content_length,
        close,
    })
}

/// Discards the declared body, first from read-ahead, then from the stream.
async fn drain_body<S>(
    stream: &mut S,
    buffer: &mut Vec<u8>,
    content_length: u64,
) -> std::io::Result<()>
where
    S: AsyncRead + Unpin,
{
    let buffered = (buffer.len() as u64).min(content_length) as usize;
    buffer.drain(..buffered);

    let remaining = content_length.saturating_sub(buffered as u64);
    if remaining == 0 {
        return Ok(());
    }
    let mut limited = stream.take(remaining);
    let drained = tokio::io::copy(&mut limited, &mut tokio::io::sink()).await?;
    if drained < remaining {
        return Err(invalid_data("connection closed mid-body"));
    }
    Ok(())
}

/// Writes the fixed success response; the response exists only to complete
/// the protocol exchange.
pub(super) async fn write_ok_response<S>(stream: &mut S, close: bool) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let response = if close { OK_RESPONSE_CLOSE } else { OK_RESPONSE };
    stream.write_all(response).await?;
    stream.flush().await
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

fn invalid_data<E>(message: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}
