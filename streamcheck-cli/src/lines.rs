//! Pull-based line reader over a streamed response body.

use futures_util::{Stream, StreamExt};
use shared::models::StreamCheckError;
use tokio::time::{Instant, timeout_at};

/// Splits a byte stream into text lines, one pull at a time.
///
/// Every pull is bounded by the same deadline. Lines end at `\n`, `\r\n` or a
/// lone `\r`, and a final unterminated line is still returned once the stream
/// ends.
#[derive(Debug)]
pub struct SseLines<S> {
    stream: S,
    buffer: Vec<u8>,
    deadline: Instant,
    timeout_secs: u64,
    exhausted: bool,
}

impl<S, B> SseLines<S>
where
    S: Stream<Item = Result<B, StreamCheckError>> + Unpin,
    B: AsRef<[u8]>,
{
    /// Wraps `stream`; every pull must finish before `deadline`.
    pub fn new(stream: S, deadline: Instant, timeout_secs: u64) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            deadline,
            timeout_secs,
            exhausted: false,
        }
    }

    /// Returns the next line, or `None` once the stream has closed and the
    /// buffer is drained.
    ///
    /// # Errors
    /// Fails when the deadline passes, the transport reports an error, or a
    /// line is not valid UTF-8.
    pub async fn next_line(&mut self) -> Result<Option<String>, StreamCheckError> {
        loop {
            if let Some((len, terminator)) = self.line_end() {
                let mut line: Vec<u8> = self.buffer.drain(..len + terminator).collect();
                line.truncate(len);
                return decode(line).map(Some);
            }

            if self.exhausted {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return decode(std::mem::take(&mut self.buffer)).map(Some);
            }

            match timeout_at(self.deadline, self.stream.next()).await {
                Err(_) => {
                    return Err(StreamCheckError::Timeout {
                        seconds: self.timeout_secs,
                    });
                }
                Ok(None) => self.exhausted = true,
                Ok(Some(Err(err))) => return Err(err),
                Ok(Some(Ok(chunk))) => self.buffer.extend_from_slice(chunk.as_ref()),
            }
        }
    }

    /// Length of the next buffered line and of its terminator. A `\r` at the
    /// end of the buffer waits for one more byte unless the stream is done.
    fn line_end(&self) -> Option<(usize, usize)> {
        let end = self
            .buffer
            .iter()
            .position(|byte| matches!(byte, b'\n' | b'\r'))?;
        if self.buffer[end] == b'\n' {
            return Some((end, 1));
        }
        match self.buffer.get(end + 1) {
            Some(b'\n') => Some((end, 2)),
            Some(_) => Some((end, 1)),
            None if self.exhausted => Some((end, 1)),
            None => None,
        }
    }
}

fn decode(line: Vec<u8>) -> Result<String, StreamCheckError> {
    String::from_utf8(line).map_err(|err| StreamCheckError::decode(err.to_string()))
}
