//! # IMGXFER Files
//!
//! Block transfer engine for IMGXFER.
//!
//! This crate provides:
//! - Aligned buffers usable for direct I/O
//! - File handles with `O_DIRECT` enabled, and toggles for it
//! - Streaming receive of an exact byte count into a file at an offset
//!
//! All sizes, offsets and buffer addresses used with direct I/O must be
//! multiples of [`SECTOR_SIZE`].

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(not(target_os = "linux"))]
compile_error!("imgxfer-files requires Linux O_DIRECT support");

pub mod aligned;
pub mod direct;
pub mod error;
pub mod receive;

pub use aligned::AlignedBuffer;
pub use direct::DirectFile;
pub use error::{FileError, Result};
pub use receive::{Progress, ReceiveOptions, Receiver, receive};

/// Minimal direct I/O sector size (512 bytes)
pub const SECTOR_SIZE: usize = 512;

/// Default transfer buffer size (8 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Default transfer buffer alignment (4 KiB)
pub const DEFAULT_ALIGNMENT: usize = 4096;

/// Check if `value` is a multiple of [`SECTOR_SIZE`]
pub fn is_sector_aligned(value: u64) -> bool {
    value % SECTOR_SIZE as u64 == 0
}
