//! Ticket parsing and validation.
//!
//! A ticket is the JSON record a management system hands us to grant
//! access to a single image:
//!
//! ```json
//! {
//!     "mode": "rw",
//!     "size": 1073741824,
//!     "timeout": 300,
//!     "url": "file:///var/lib/images/disk.raw",
//!     "uuid": "3facfbc1-68e0-4b77-b0c6-87e66fcabcc2"
//! }
//! ```
//!
//! Every field is required. A ticket that fails validation is rejected
//! here and never reaches the registry.

use crate::error::{AuthError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Access mode granted by a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Read only
    #[serde(rename = "r")]
    Read,
    /// Write only
    #[serde(rename = "w")]
    Write,
    /// Read and write
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Mode {
    /// Wire symbol for this mode
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "rw",
        }
    }

    /// Check whether this mode grants `op`
    pub fn allows(self, op: Operation) -> bool {
        self.as_str().contains(op.as_char())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "rw" => Ok(Self::ReadWrite),
            other => Err(AuthError::MalformedTicket(format!(
                "invalid mode: {other:?}"
            ))),
        }
    }
}

/// Operation requested against an authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read from the target
    Read,
    /// Write to the target
    Write,
}

impl Operation {
    /// Mode character checked against the ticket mode
    pub fn as_char(self) -> char {
        match self {
            Self::Read => 'r',
            Self::Write => 'w',
        }
    }
}

/// A validated ticket
///
/// Tickets are immutable; construct one with [`Ticket::parse`] or
/// [`Ticket::new`], both of which apply the same validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    mode: Mode,
    size: u64,
    url: String,
    uuid: String,
    timeout: u64,
}

/// Ticket as it appears on the wire, before validation
#[derive(Debug, Deserialize)]
struct RawTicket {
    mode: Option<String>,
    size: Option<i64>,
    url: Option<String>,
    uuid: Option<String>,
    timeout: Option<i64>,
}

impl Ticket {
    /// Create a ticket from its parts
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedTicket`] if `size` or `timeout` is zero,
    /// or if `url` or `uuid` is empty.
    pub fn new(
        mode: Mode,
        size: u64,
        url: impl Into<String>,
        uuid: impl Into<String>,
        timeout: u64,
    ) -> Result<Self> {
        let ticket = Self {
            mode,
            size,
            url: url.into(),
            uuid: uuid.into(),
            timeout,
        };
        ticket.validate()?;
        Ok(ticket)
    }

    /// Parse a ticket from its JSON representation
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedTicket`] describing the first invalid
    /// or missing field.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let raw: RawTicket = serde_json::from_slice(buf)
            .map_err(|e| AuthError::MalformedTicket(format!("invalid json: {e}")))?;

        let mode = match raw.mode {
            Some(mode) => mode.parse()?,
            None => return Err(malformed("mode is required")),
        };
        let size = match raw.size {
            Some(size) if size > 0 => size as u64,
            Some(size) => return Err(malformed(format!("size must be positive: {size}"))),
            None => return Err(malformed("size is required")),
        };
        let timeout = match raw.timeout {
            Some(timeout) if timeout > 0 => timeout as u64,
            Some(timeout) => {
                return Err(malformed(format!("timeout must be positive: {timeout}")));
            }
            None => return Err(malformed("timeout is required")),
        };

        Self::new(
            mode,
            size,
            raw.url.unwrap_or_default(),
            raw.uuid.unwrap_or_default(),
            timeout,
        )
    }

    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(malformed("size must be positive: 0"));
        }
        if self.url.is_empty() {
            return Err(malformed("url is required"));
        }
        if self.uuid.is_empty() {
            return Err(malformed("uuid is required"));
        }
        if self.timeout == 0 {
            return Err(malformed("timeout is required"));
        }
        Ok(())
    }

    /// Serialize the ticket to its JSON wire format
    ///
    /// # Errors
    ///
    /// Returns the serializer error, if any.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Granted access mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Maximum number of bytes the ticket authorizes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Target url as given in the ticket
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ticket identity, used as the registry key
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Validity window, counted from activation
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl FromStr for Ticket {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s.as_bytes())
    }
}

fn malformed(msg: impl Into<String>) -> AuthError {
    AuthError::MalformedTicket(msg.into())
}
