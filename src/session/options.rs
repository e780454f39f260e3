//! Connection and close options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use web_socket_support::{CloseRequest, ConnectOptions};
//!
//! let options = ConnectOptions::parse("wss://echo.example/socket")?
//!     .with_header("Authorization", "Bearer token")
//!     .with_ping_interval(Duration::from_secs(30));
//!
//! let close = CloseRequest::new(1001, "going away");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Close code used when none is given.
pub const DEFAULT_CLOSE_CODE: u16 = 1000;

/// Close reason used when none is given.
pub const DEFAULT_CLOSE_REASON: &str = "Client done.";

/// Longest accepted keepalive ping period.
pub const MAX_PING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// ConnectOptions
// ============================================================================

/// Parameters for a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Absolute `ws://` or `wss://` URL.
    pub server_url: Url,

    /// Extra handshake headers (name to value).
    pub headers: FxHashMap<String, String>,

    /// Keepalive ping period.
    ///
    /// Honored by the tungstenite transport; other transports may ignore it.
    pub ping_interval: Option<Duration>,
}

impl ConnectOptions {
    /// Creates options for an already-parsed URL.
    #[inline]
    #[must_use]
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            headers: FxHashMap::default(),
            ping_interval: None,
        }
    }

    /// Parses and validates a server URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the string is not an absolute URL
    /// - [`Error::InvalidArgument`] if the scheme is not `ws` or `wss`
    pub fn parse(server_url: &str) -> Result<Self> {
        let url = Url::parse(server_url)?;

        match url.scheme() {
            "ws" | "wss" => Ok(Self::new(url)),
            scheme => Err(Error::invalid_argument(format!(
                "Unsupported URL scheme '{scheme}', expected ws or wss"
            ))),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectOptions {
    /// Adds a handshake header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds multiple handshake headers.
    #[inline]
    #[must_use]
    pub fn with_headers(
        mut self,
        headers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the keepalive ping period.
    ///
    /// A zero period disables the ping. Periods above [`MAX_PING_INTERVAL`]
    /// are clamped to it.
    #[inline]
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = (!interval.is_zero()).then(|| interval.min(MAX_PING_INTERVAL));
        self
    }
}

// ============================================================================
// CloseRequest
// ============================================================================

/// Graceful close parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    /// Close code.
    pub code: u16,
    /// Close reason.
    pub reason: String,
}

impl CloseRequest {
    /// Creates a close request.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl Default for CloseRequest {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSE_CODE, DEFAULT_CLOSE_REASON)
    }
}

// ============================================================================
// Tests
// ============================================================================
