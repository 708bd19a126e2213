//! Trait abstraction for line-oriented serial input to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::warn;

use crate::error::{Result, WheelBridgeError};
use crate::protocol::decoder::MAX_LINE_LEN;

/// Trait for reading newline-terminated text from a connection
#[async_trait]
pub trait LineTransport: Send {
    /// Wait up to `timeout` for one complete line
    ///
    /// Returns `Ok(None)` when nothing complete arrived in time. The line is
    /// returned without its trailing whitespace or newline.
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// Result of filling the line buffer
enum Fill {
    Line,
    Overflow,
    Eof,
}

/// Newline reader over any async byte stream
///
/// Bytes of a line that straddles a timeout stay buffered and are completed
/// by the next call. Invalid UTF-8 is replaced rather than rejected.
///
/// A run of [`MAX_LINE_LEN`] bytes without a newline is handed out unterminated
/// (the decoder rejects it) and the rest of that line is dropped, so noise on
/// the wire cannot grow the buffer.
pub struct LineReader<R> {
    reader: Option<BufReader<R>>,
    buf: Vec<u8>,
    discarding: bool,
}

impl<R: AsyncRead + Unpin + Send> LineReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            reader: Some(BufReader::new(stream)),
            buf: Vec::with_capacity(64),
            discarding: false,
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
        self.buf.clear();
        line
    }

    fn take_overflow(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        line
    }
}

/// Reads into `buf` until a newline, end of stream, or the length cap
///
/// All progress lives in `buf` and `discarding`, so dropping the future at a
/// timeout loses nothing.
async fn fill_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
    discarding: &mut bool,
) -> io::Result<Fill> {
    loop {
        let remaining = MAX_LINE_LEN.saturating_sub(buf.len()) as u64;
        let n = (&mut *reader).take(remaining).read_until(b'\n', buf).await?;
        if n == 0 {
            return Ok(Fill::Eof);
        }

        let complete = buf.last() == Some(&b'\n');
        if *discarding {
            buf.clear();
            if complete {
                *discarding = false;
            }
            continue;
        }
        if complete {
            return Ok(Fill::Line);
        }
        if buf.len() >= MAX_LINE_LEN {
            *discarding = true;
            return Ok(Fill::Overflow);
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineTransport for LineReader<R> {
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(WheelBridgeError::Transport("connection closed".to_string()));
        };

        let filled = tokio::time::timeout(
            timeout,
            fill_line(reader, &mut self.buf, &mut self.discarding),
        )
        .await;

        match filled {
            Err(_) => Ok(None),
            Ok(Ok(Fill::Line)) => Ok(Some(self.take_line())),
            Ok(Ok(Fill::Overflow)) => {
                warn!(
                    "Discarding serial input: no newline within {} bytes",
                    MAX_LINE_LEN
                );
                Ok(Some(self.take_overflow()))
            }
            Ok(Ok(Fill::Eof)) => {
                self.buf.clear();
                Err(WheelBridgeError::Transport(
                    "serial stream ended (device disconnected?)".to_string(),
                ))
            }
            Ok(Err(e)) => Err(WheelBridgeError::Transport(format!(
                "Failed to read from serial port: {}",
                e
            ))),
        }
    }

    /// Releases the underlying stream; later reads fail
    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        self.buf.clear();
        self.discarding = false;
        Ok(())
    }
}
