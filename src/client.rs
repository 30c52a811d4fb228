//! Ammeter device client
//!
//! A device answers a single command with a single textual reading. The
//! sampler only sees the [`AmmeterClient`] trait, so tests can substitute
//! in-process fakes for the TCP transport.

use crate::{
    error::{AppError, Result},
    models::DeviceConfig,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Request/response exchange with one ammeter
#[async_trait]
pub trait AmmeterClient: Send + Sync {
    /// Send the device's command and return its raw textual answer
    async fn acquire(&self, device: &DeviceConfig) -> Result<String>;
}

/// TCP transport: connect, write the command, read one response, close
#[derive(Debug, Clone)]
pub struct TcpAmmeterClient {
    request_timeout: Duration,
    max_response_bytes: usize,
}

impl TcpAmmeterClient {
    /// Create a client with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(crate::defaults::DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout covering connect, write and read
    pub fn with_timeout(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            max_response_bytes: crate::defaults::MAX_RESPONSE_BYTES,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    async fn exchange(&self, device: &DeviceConfig) -> Result<String> {
        let address = device.address();
        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|e| AppError::transport(format!("Failed to connect to {}: {}", address, e)))?;

        stream
            .write_all(device.command_bytes())
            .await
            .map_err(|e| AppError::transport(format!("Failed to send command to {}: {}", address, e)))?;

        let mut buffer = vec![0u8; self.max_response_bytes];
        let read = stream
            .read(&mut buffer)
            .await
            .map_err(|e| AppError::transport(format!("Failed to read from {}: {}", address, e)))?;

        if read == 0 {
            return Err(AppError::transport(format!("{} closed the connection without a reading", address)));
        }

        Ok(String::from_utf8_lossy(&buffer[..read]).trim().to_string())
    }
}

impl Default for TcpAmmeterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AmmeterClient for TcpAmmeterClient {
    async fn acquire(&self, device: &DeviceConfig) -> Result<String> {
        timeout(self.request_timeout, self.exchange(device))
            .await
            .map_err(|_| AppError::timeout(format!(
                "{} did not answer within {}ms",
                device.address(),
                self.request_timeout.as_millis()
            )))?
    }
}

/// Parse a device answer into a finite reading
pub fn parse_reading(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| AppError::parse(format!("Unparsable reading '{}'", trimmed)))?;

    if !value.is_finite() {
        return Err(AppError::parse(format!("Non-finite reading '{}'", trimmed)));
    }

    Ok(value)
}
