//! Line splitting over a child's output pipe.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK: usize = 8 * 1024;

/// Reads lines terminated by `\n` or `\r`.
///
/// ffmpeg redraws its stats line with a bare carriage return, so a plain
/// `lines()` reader would only see progress once the run is over. Empty
/// lines (such as the gap in `\r\n`) are skipped; invalid UTF-8 is replaced.
pub struct LineSplitter<R> {
    reader: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineSplitter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Next non-empty line, or `None` at end of stream.
    ///
    /// Cancel safe: dropping the future between reads loses no data.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
                let raw: Vec<u8> = self.buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
                if line.trim().is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let raw = std::mem::take(&mut self.buf);
                let line = String::from_utf8_lossy(&raw).into_owned();
                if line.trim().is_empty() {
                    return Ok(None);
                }
                return Ok(Some(line));
            }

            let mut chunk = [0u8; CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut splitter = LineSplitter::new(input);
        let mut lines = Vec::new();
        while let Some(line) = splitter.next_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_splits_on_newline_and_carriage_return() {
        let lines = collect(b"Input #0\nframe=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\ndone").await;
        assert_eq!(
            lines,
            vec![
                "Input #0",
                "frame=1 time=00:00:01.00",
                "frame=2 time=00:00:02.00",
                "done"
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(collect(b"").await.is_empty());
        assert!(collect(b"\r\n\r\n").await.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let lines = tokio_test::block_on(collect(b"caf\xe9\n"));
        assert_eq!(lines, vec!["caf\u{fffd}"]);
    }
}
