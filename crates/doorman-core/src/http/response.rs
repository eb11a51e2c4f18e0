use core::ops::Range;

use embedded_io::Error as _;
use embedded_io_async::Read;

use super::HttpError;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Status line and the framing headers of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub content_length: Option<usize>,
    pub chunked: bool,
}

/// Parse the response head (everything before the blank line).
pub fn parse_head(head: &str) -> Result<ResponseHead, HttpError> {
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(HttpError::Malformed)?;
    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed);
    }
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..=599).contains(code))
        .ok_or(HttpError::Malformed)?;

    let mut content_length = None;
    let mut chunked = false;

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::Malformed);
        };
        let name = name.trim();
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-length") {
            let len = value.parse::<usize>().map_err(|_| HttpError::Malformed)?;
            content_length = Some(len);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value
                .split(',')
                .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        }
    }

    Ok(ResponseHead {
        status,
        content_length,
        chunked,
    })
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

async fn fill<R: Read>(conn: &mut R, buf: &mut [u8]) -> Result<usize, HttpError> {
    conn.read(buf).await.map_err(|e| HttpError::Read(e.kind()))
}

/// Read a complete response into `buf`.
///
/// Returns the status code and the range of `buf` holding the body.
pub async fn read_response<R: Read>(
    conn: &mut R,
    buf: &mut [u8],
) -> Result<(u16, Range<usize>), HttpError> {
    let mut filled = 0;

    let head_end = loop {
        if let Some(end) = find_head_end(&buf[..filled]) {
            break end;
        }
        if filled == buf.len() {
            return Err(HttpError::ResponseTooLarge);
        }
        let n = fill(conn, &mut buf[filled..]).await?;
        if n == 0 {
            return Err(HttpError::Malformed);
        }
        filled += n;
    };

    let head = {
        let text = core::str::from_utf8(&buf[..head_end]).map_err(|_| HttpError::Malformed)?;
        parse_head(text)?
    };
    if head.chunked {
        return Err(HttpError::UnsupportedEncoding);
    }

    let body_start = head_end + HEAD_TERMINATOR.len();

    match head.content_length {
        Some(len) => {
            let body_end = body_start
                .checked_add(len)
                .filter(|end| *end <= buf.len())
                .ok_or(HttpError::ResponseTooLarge)?;

            while filled < body_end {
                let n = fill(conn, &mut buf[filled..body_end]).await?;
                if n == 0 {
                    return Err(HttpError::Truncated);
                }
                filled += n;
            }

            Ok((head.status, body_start..body_end))
        }
        None => {
            // Connection: close, the body runs until EOF.
            loop {
                if filled == buf.len() {
                    return Err(HttpError::ResponseTooLarge);
                }
                let n = fill(conn, &mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }

            Ok((head.status, body_start..filled))
        }
    }
}
