//! # Sample Link Module
//!
//! Receives concentration samples as UDP datagrams.
//!
//! Two payload formats are accepted:
//! - `text`: the bare sample token, e.g. `2.35`
//! - `json`: `{"eeg": 2.35, "time": 1712345678}` as published by the EEG
//!   headset bridge; the `eeg` field is rendered back to text
//!
//! Either way the result is a raw token for the input gate, so range and
//! parse rules live in one place.

use std::net::SocketAddr;

use bytes::BytesMut;
use serde::Deserialize;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{EegDroneError, Result};

/// Largest datagram the link accepts by default.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 255;

/// Default UDP port of the sample feed.
pub const DEFAULT_PORT: u16 = 4210;

/// Datagram payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    #[default]
    Text,
    Json,
}

/// JSON sample message.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EegMessage {
    pub eeg: f64,
    #[serde(default)]
    pub time: Option<u64>,
}

/// Extracts the raw sample token from a datagram payload.
///
/// # Errors
///
/// Returns [`EegDroneError::Link`] for a JSON payload that does not parse.
pub fn decode_payload(payload: &[u8], format: PayloadFormat) -> Result<String> {
    match format {
        PayloadFormat::Text => Ok(String::from_utf8_lossy(payload).into_owned()),
        PayloadFormat::Json => {
            let message: EegMessage = serde_json::from_slice(payload)
                .map_err(|e| EegDroneError::Link(format!("malformed JSON sample: {}", e)))?;
            Ok(message.eeg.to_string())
        }
    }
}

/// UDP receiver for the sample feed.
#[derive(Debug)]
pub struct SampleReceiver {
    socket: UdpSocket,
    buf: BytesMut,
    max_packet_size: usize,
    format: PayloadFormat,
}

impl SampleReceiver {
    /// Binds the receiving socket.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or already in use
    pub async fn bind(config: &LinkConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.bind_address, config.port);
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|e| EegDroneError::Link(format!("failed to bind {}: {}", addr, e)))?;

        info!("Listening for samples on {} ({:?} payload)", socket.local_addr()?, config.payload);

        Ok(Self {
            socket,
            buf: BytesMut::with_capacity(config.max_packet_size),
            max_packet_size: config.max_packet_size,
            format: config.payload,
        })
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Waits for the next datagram and returns its raw token and sender.
    ///
    /// Cancel safe, so it can sit in a `select!` arm.
    ///
    /// # Errors
    ///
    /// Returns error on socket failure or an undecodable payload
    pub async fn recv(&mut self) -> Result<(String, SocketAddr)> {
        self.buf.clear();
        self.buf.reserve(self.max_packet_size);

        let (len, peer) = self.socket.recv_buf_from(&mut self.buf).await?;
        let len = len.min(self.max_packet_size);
        debug!("Received {} bytes from {}", len, peer);

        let token = decode_payload(&self.buf[..len], self.format)?;
        Ok((token, peer))
    }
}
