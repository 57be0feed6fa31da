//! Outbound channels to dependent roles.

use crate::dispatch::Role;
use crate::interceptor::{ClientTrace, ClientTraceLayer};
use crate::trace::Tracer;
use std::time::Duration;
use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tower::Layer;
use tracing::info;

/// A traced channel to one dependent. Cloning shares the underlying HTTP/2
/// connection.
pub type Connection = ClientTrace<Channel>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialSettings {
    pub connect_timeout: Duration,
}

impl Default for DialSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(crate::config::DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to dial {role} at {address}: {source}")]
pub struct DialError {
    pub role: Role,
    pub address: String,
    #[source]
    pub source: tonic::transport::Error,
}

/// Prefix `http://` unless the address already names a scheme.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Connect to `role` at `address` and wrap the channel with the client trace
/// layer. Connects eagerly, so an unreachable dependent fails here.
pub async fn dial(
    role: Role,
    address: &str,
    tracer: &Tracer,
    settings: &DialSettings,
) -> Result<Connection, DialError> {
    let target = normalize_address(address);
    let dial_error = |source| DialError {
        role,
        address: target.clone(),
        source,
    };
    let channel = Endpoint::from_shared(target.clone())
        .map_err(dial_error)?
        .connect_timeout(settings.connect_timeout)
        .connect()
        .await
        .map_err(dial_error)?;

    info!(dependent = %role, address = %target, "connected");
    Ok(ClientTraceLayer::new(tracer.clone()).layer(channel))
}
