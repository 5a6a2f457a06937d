//! Persistent connection to the mixing engine

use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::command::Command;
use super::framing::{parse_feed_ids, FrameReader};
use crate::config::DownstreamConfig;
use crate::constants::READ_CHUNK_SIZE;
use crate::error::DownstreamError;

/// Line-protocol client for the mixing engine.
///
/// A client whose connect failed stays usable as a value but every command
/// returns [`DownstreamError::NotConnected`]. A failed write or reply read
/// drops the connection into the same state. There is no reconnect.
pub struct DownstreamClient<S = TcpStream> {
    stream: Option<S>,
    address: String,
    reader: FrameReader,
    commands_sent: u64,
}

impl DownstreamClient<TcpStream> {
    /// Connect to the engine at `config.address`.
    ///
    /// Failure is logged and yields a disconnected client.
    pub async fn connect(config: &DownstreamConfig) -> Self {
        match Self::open(config).await {
            Ok(stream) => {
                tracing::info!("Connected to mixing engine at {}", config.address);
                Self::from_stream(stream, config).await
            }
            Err(e) => {
                tracing::error!("Unable to connect to mixing engine: {}", e);
                Self::disconnected(config)
            }
        }
    }

    async fn open(config: &DownstreamConfig) -> Result<TcpStream, DownstreamError> {
        let failed = |reason: String| DownstreamError::ConnectionFailed {
            address: config.address.clone(),
            reason,
        };

        let stream = tokio::time::timeout(
            config.connect_timeout(),
            TcpStream::connect(&config.address),
        )
        .await
        .map_err(|_| failed("connect timed out".to_string()))?
        .map_err(|e| failed(e.to_string()))?;

        stream.set_nodelay(true).map_err(|e| failed(e.to_string()))?;

        if let Some(idle) = config.keepalive() {
            let keepalive = TcpKeepalive::new().with_time(idle);
            if let Err(e) = SockRef::from(&stream).set_tcp_keepalive(&keepalive) {
                tracing::warn!("Failed to enable TCP keepalive: {}", e);
            }
        }

        Ok(stream)
    }
}

impl<S> DownstreamClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an open stream, discarding the engine's greeting banner
    pub async fn from_stream(mut stream: S, config: &DownstreamConfig) -> Self {
        discard_banner(&mut stream, config.banner_timeout()).await;

        Self {
            stream: Some(stream),
            address: config.address.clone(),
            reader: FrameReader::new(config.read_timeout()),
            commands_sent: 0,
        }
    }

    /// A client with no connection
    pub fn disconnected(config: &DownstreamConfig) -> Self {
        Self {
            stream: None,
            address: config.address.clone(),
            reader: FrameReader::new(config.read_timeout()),
            commands_sent: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Write one command line; read the framed reply when `expect_response`
    pub async fn send_command(
        &mut self,
        command: &Command,
        expect_response: bool,
    ) -> Result<Option<String>, DownstreamError> {
        let stream = self.stream.as_mut().ok_or(DownstreamError::NotConnected)?;

        let line = format!("{}\n", command);
        tracing::debug!("-> {}", command);

        let written = match stream.write_all(line.as_bytes()).await {
            Ok(()) => stream.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            tracing::error!("Lost connection to mixing engine at {}: {}", self.address, e);
            self.stream = None;
            return Err(DownstreamError::SendFailed(e.to_string()));
        }
        self.commands_sent += 1;

        if !expect_response {
            return Ok(None);
        }

        match self.reader.read_frame(stream).await {
            Ok(reply) => Ok(Some(reply)),
            Err(e) => {
                // A late reply would otherwise be read as the next command's answer
                tracing::error!(
                    "Dropping connection to mixing engine at {}: {}",
                    self.address,
                    e
                );
                self.stream = None;
                Err(e)
            }
        }
    }

    /// Ask the engine which feeds exist
    pub async fn list_feed_ids(&mut self) -> Result<Vec<u32>, DownstreamError> {
        let reply = self
            .send_command(&Command::FeedList, true)
            .await?
            .unwrap_or_default();
        Ok(parse_feed_ids(&reply))
    }

    /// Close the connection
    pub async fn shutdown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::warn!("Error closing engine connection: {}", e);
            }
            tracing::info!("Closed connection to mixing engine at {}", self.address);
        }
    }
}

/// The engine greets every new connection unprompted; read one burst and drop it
async fn discard_banner<S>(stream: &mut S, wait: Duration)
where
    S: AsyncRead + Unpin,
{
    let mut banner = vec![0u8; READ_CHUNK_SIZE];

    match tokio::time::timeout(wait, stream.read(&mut banner)).await {
        Ok(Ok(0)) => tracing::warn!("Engine closed the connection before sending a banner"),
        Ok(Ok(n)) => tracing::debug!(
            "Engine banner: {}",
            String::from_utf8_lossy(&banner[..n]).trim_end()
        ),
        Ok(Err(e)) => tracing::warn!("Failed to read engine banner: {}", e),
        Err(_) => tracing::warn!("No banner from engine within {:?}", wait),
    }
}
