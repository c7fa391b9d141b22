//! Handshake timing through the operating system's `connect()`

use super::timing::timed;
use super::Prober;
use crate::error::Result;
use crate::models::ProbeRecord;
use crate::types::ProbeMode;
use async_trait::async_trait;
use std::io;
use std::net::{Shutdown, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpSocket;

/// Byte repeated to build the post-handshake payload
const PAYLOAD_BYTE: u8 = b'a';

/// Probe that completes a full handshake and half-closes the read side
#[derive(Debug, Clone)]
pub struct ConnectProbe {
    timeout: Option<Duration>,
    payload: Vec<u8>,
}

impl ConnectProbe {
    pub fn new(timeout: Option<Duration>, payload_size: usize) -> Self {
        Self {
            timeout,
            payload: vec![PAYLOAD_BYTE; payload_size],
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    async fn handshake(&self, socket: TcpSocket, target: SocketAddr) -> io::Result<()> {
        let mut stream = socket.connect(target).await?;

        if !self.payload.is_empty() {
            stream.write_all(&self.payload).await?;
        }

        let stream = stream.into_std()?;
        stream.shutdown(Shutdown::Read)
    }

    async fn bounded_handshake(&self, socket: TcpSocket, target: SocketAddr) -> io::Result<()> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.handshake(socket, target))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "handshake timed out"))?,
            None => self.handshake(socket, target).await,
        }
    }
}

#[async_trait]
impl Prober for ConnectProbe {
    async fn probe(&self, target: SocketAddr) -> Result<ProbeRecord> {
        let address = target.ip().to_string();
        let port = target.port();

        let socket = match target {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        };
        let socket = match socket {
            Ok(socket) => socket,
            Err(_) => return Ok(ProbeRecord::failed(address, port)),
        };

        let (elapsed, outcome) = timed(self.bounded_handshake(socket, target)).await.into_parts();

        Ok(match outcome {
            Ok(()) => ProbeRecord::success(elapsed, address, port),
            Err(_) => ProbeRecord::failed(address, port),
        })
    }

    fn mode(&self) -> ProbeMode {
        ProbeMode::Connect
    }
}
