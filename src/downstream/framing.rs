//! Sentinel-framed replies
//!
//! The engine terminates a solicited reply with `STAT: \n` or `MSG: \n`.
//! There is no length prefix and no escaping, so a terminator that appears
//! inside the payload ends the frame early. That ambiguity lives here and
//! nowhere else.

use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

use crate::constants::{READ_CHUNK_SIZE, REPLY_TERMINATORS};
use crate::error::DownstreamError;

const FEED_ID_MARKER: &str = "Feed ID ";

/// Reads one terminator-framed reply
#[derive(Debug, Clone)]
pub struct FrameReader {
    terminators: Vec<&'static str>,
    /// Deadline for the whole frame, not per read
    timeout: Option<Duration>,
}

impl FrameReader {
    /// Reader for the engine's status/message terminators
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_terminators(REPLY_TERMINATORS.to_vec(), timeout)
    }

    pub fn with_terminators(terminators: Vec<&'static str>, timeout: Option<Duration>) -> Self {
        Self {
            terminators,
            timeout,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the accumulated bytes end with a terminator
    pub fn is_complete(&self, buf: &[u8]) -> bool {
        self.terminators
            .iter()
            .any(|terminator| buf.ends_with(terminator.as_bytes()))
    }

    /// Accumulate reads until a terminator ends the buffer or the peer closes
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<String, DownstreamError>
    where
        R: AsyncRead + Unpin,
    {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

        loop {
            buf.reserve(READ_CHUNK_SIZE);

            let read = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, reader.read_buf(&mut buf))
                    .await
                    .map_err(|_| DownstreamError::Timeout)?,
                None => reader.read_buf(&mut buf).await,
            };

            let n = read.map_err(|e| DownstreamError::ReceiveFailed(e.to_string()))?;
            if n == 0 {
                tracing::debug!("Engine closed the connection mid-frame");
                break;
            }
            if self.is_complete(&buf) {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Every integer following `Feed ID `, in order of appearance
pub fn parse_feed_ids(text: &str) -> Vec<u32> {
    text.match_indices(FEED_ID_MARKER)
        .filter_map(|(start, _)| {
            let rest = &text[start + FEED_ID_MARKER.len()..];
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            rest[..end].parse().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_parse_feed_ids() {
        let reply = "STAT: Feed ID 1 name Camera\nSTAT: Feed ID 12 name GFX\nSTAT: Feed ID x\nSTAT: Feed ID 3\nSTAT: \n";
        assert_eq!(parse_feed_ids(reply), vec![1, 12, 3]);
        assert!(parse_feed_ids("MSG: nothing here\nMSG: \n").is_empty());
    }

    #[test]
    fn test_is_complete() {
        let reader = FrameReader::new(None);
        assert!(reader.is_complete(b"STAT: Feed ID 1\nSTAT: \n"));
        assert!(reader.is_complete(b"MSG: \n"));
        assert!(!reader.is_complete(b"STAT: Feed ID 1\n"));
        assert!(!reader.is_complete(b"STAT: \nmore"));
    }

    #[tokio::test]
    async fn test_reads_across_chunks() {
        let (mut engine, mut client) = tokio::io::duplex(64);
        let reader = FrameReader::new(Some(Duration::from_secs(2)));

        let writer = tokio::spawn(async move {
            engine.write_all(b"STAT: Feed ID 1\n").await.unwrap();
            engine.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            engine.write_all(b"STAT: Feed ID 2\nSTAT: \n").await.unwrap();
            engine
        });

        let frame = reader.read_frame(&mut client).await.unwrap();
        assert_eq!(frame, "STAT: Feed ID 1\nSTAT: Feed ID 2\nSTAT: \n");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_ends_frame() {
        let (mut engine, mut client) = tokio::io::duplex(64);
        engine.write_all(b"MSG: partial").await.unwrap();
        drop(engine);

        let frame = FrameReader::new(None).read_frame(&mut client).await.unwrap();
        assert_eq!(frame, "MSG: partial");
    }

    #[tokio::test]
    async fn test_missing_terminator_times_out() {
        let (mut engine, mut client) = tokio::io::duplex(64);
        engine.write_all(b"STAT: Feed ID 1\n").await.unwrap();

        let reader = FrameReader::new(Some(Duration::from_millis(50)));
        let result = reader.read_frame(&mut client).await;
        assert!(matches!(result, Err(DownstreamError::Timeout)));
        drop(engine);
    }
}
