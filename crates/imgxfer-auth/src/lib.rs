//! # IMGXFER Auth
//!
//! Ticket based authorization for image transfers.
//!
//! This crate provides:
//! - Ticket parsing and validation
//! - Authorizations with a fixed expiry computed at activation
//! - A registry checking read and write requests against active tickets
//!
//! ## Example
//!
//! ```
//! use imgxfer_auth::{Registry, Ticket};
//!
//! let ticket: Ticket = r#"{"mode": "w", "size": 1048576, "timeout": 300,
//!     "url": "file:///var/tmp/disk.raw", "uuid": "3facfbc1"}"#
//!     .parse()
//!     .unwrap();
//!
//! let registry = Registry::new();
//! registry.activate(ticket).unwrap();
//!
//! let url = registry.check_write("3facfbc1", 1048576).unwrap();
//! assert_eq!(url.path(), "/var/tmp/disk.raw");
//! assert!(registry.check_read("3facfbc1", 1).is_err());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authorization;
pub mod error;
pub mod registry;
pub mod ticket;
pub mod uuid;

pub use authorization::{Authorization, SUPPORTED_SCHEMES};
pub use error::{AuthError, Denial, Result};
pub use registry::Registry;
pub use ticket::{Mode, Operation, Ticket};
pub use url::Url;
