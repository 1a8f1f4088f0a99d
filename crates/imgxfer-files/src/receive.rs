//! Streaming receive into a file using direct I/O.
//!
//! [`Receiver::receive`] copies exactly `size` bytes from a reader into a
//! file starting at `offset`. This is mostly like [`std::io::copy`], but:
//!
//! - it always reads full blocks, as required for direct I/O
//! - it reads exactly `size` bytes instead of up to EOF, so trailing bytes
//!   of a request body are never consumed
//! - it reports progress after each write
//!
//! `size` and `offset` must be multiples of 512 bytes. The chunk size is a
//! multiple of 512 too, so the final, possibly shorter, chunk is always a
//! whole number of sectors and the chunk size need not divide `size`.

use crate::aligned::AlignedBuffer;
use crate::direct::DirectFile;
use crate::error::{FileError, Result};
use crate::{DEFAULT_ALIGNMENT, DEFAULT_CHUNK_SIZE, SECTOR_SIZE, is_sector_aligned};
use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sink for transfer progress
///
/// `set` is called from the transferring thread with the cumulative number
/// of bytes written, and may be read concurrently by a reporting thread.
pub trait Progress: Send + Sync {
    /// Record the number of bytes transferred so far
    fn set(&self, value: u64);
}

impl Progress for AtomicU64 {
    fn set(&self, value: u64) {
        self.store(value, Ordering::Relaxed);
    }
}

/// Receive options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Size of the reusable transfer buffer, a multiple of 512
    pub chunk_size: usize,
    /// Alignment of the transfer buffer, a multiple of 512
    pub alignment: usize,
    /// Use buffered I/O if the target filesystem rejects `O_DIRECT`
    pub buffered_fallback: bool,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            alignment: DEFAULT_ALIGNMENT,
            buffered_fallback: true,
        }
    }
}

/// Receives streams into files, reusing one aligned buffer across calls
#[derive(Debug)]
pub struct Receiver {
    buf: AlignedBuffer,
    buffered_fallback: bool,
}

impl Receiver {
    /// Create a receiver, allocating its transfer buffer
    ///
    /// # Errors
    ///
    /// Returns [`FileError::InvalidArgument`] if the chunk size or alignment
    /// is not a multiple of 512, or the chunk size is zero.
    pub fn new(options: ReceiveOptions) -> Result<Self> {
        if options.chunk_size == 0 {
            return Err(FileError::invalid("chunk size must be positive"));
        }
        Ok(Self {
            buf: AlignedBuffer::new(options.chunk_size, options.alignment)?,
            buffered_fallback: options.buffered_fallback,
        })
    }

    /// Size of the transfer buffer
    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    /// Copy `size` bytes from `reader` to `path`, starting at `offset`
    ///
    /// The file must exist; it is neither created nor truncated. The file is
    /// synced before returning, also when the copy failed. The first error
    /// wins: a sync failure is reported only if the copy succeeded.
    ///
    /// Returns the number of bytes received, always `size` on success.
    ///
    /// # Errors
    ///
    /// - [`FileError::InvalidArgument`] if `size` or `offset` is not a
    ///   multiple of 512; no I/O is performed
    /// - [`FileError::SourceExhausted`] if `reader` ends early
    /// - [`FileError::Io`] on read, write or sync failure
    pub fn receive<P, R>(
        &mut self,
        path: P,
        reader: &mut R,
        size: u64,
        offset: u64,
        progress: Option<&dyn Progress>,
    ) -> Result<u64>
    where
        P: AsRef<Path>,
        R: Read + ?Sized,
    {
        let path = path.as_ref();
        if !is_sector_aligned(size) {
            return Err(FileError::invalid(format!(
                "size is not a multiple of {SECTOR_SIZE} bytes: {size}"
            )));
        }
        if !is_sector_aligned(offset) {
            return Err(FileError::invalid(format!(
                "offset is not a multiple of {SECTOR_SIZE} bytes: {offset}"
            )));
        }

        let mut options = OpenOptions::new();
        options.write(true);
        let mut file = if self.buffered_fallback {
            DirectFile::open_or_buffered(path, &options)?
        } else {
            DirectFile::open(path, &options)?
        };

        tracing::debug!(
            "Receiving {} bytes to {} at offset {} (direct={}, chunk_size={})",
            size,
            path.display(),
            offset,
            file.is_direct(),
            self.buf.len()
        );

        let result = self.copy(&mut file, reader, size, offset, progress);
        let synced = file.sync_all();
        // file is closed here on every path

        finish(result, synced)
    }

    fn copy<R: Read + ?Sized>(
        &mut self,
        file: &mut DirectFile,
        reader: &mut R,
        size: u64,
        offset: u64,
        progress: Option<&dyn Progress>,
    ) -> Result<u64> {
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))?;
        }

        let mut received = 0u64;
        while received < size {
            let todo = (size - received).min(self.buf.len() as u64) as usize;
            let block = &mut self.buf[..todo];

            reader.read_exact(block).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => FileError::SourceExhausted { received, size },
                _ => FileError::Io(e),
            })?;

            if let Err(e) = write_block(file, block) {
                // Some devices need a larger logical block than 512 bytes.
                if !(self.buffered_fallback
                    && file.is_direct()
                    && e.raw_os_error() == Some(libc::EINVAL))
                {
                    return Err(e.into());
                }
                tracing::warn!(
                    "Direct write rejected at offset {}, retrying buffered",
                    offset + received
                );
                file.disable()?;
                file.seek(SeekFrom::Start(offset + received))?;
                write_block(file, block)?;
            }
            received += todo as u64;
            tracing::trace!("Wrote {} bytes ({}/{})", todo, received, size);

            if let Some(progress) = progress {
                progress.set(received);
            }
        }

        Ok(received)
    }
}

/// Combine the copy result with the final sync; the first error wins
fn finish(copied: Result<u64>, synced: io::Result<()>) -> Result<u64> {
    match (copied, synced) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => Err(e.into()),
        (Ok(received), Ok(())) => Ok(received),
    }
}

/// Write all of `block`, logging short writes
///
/// A short write without an error is not expected on an aligned direct I/O
/// path and usually means the device is full.
fn write_block(file: &mut DirectFile, block: &[u8]) -> io::Result<()> {
    let mut written = 0;
    while written < block.len() {
        match file.write(&block[written..]) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => {
                if n < block.len() - written {
                    tracing::warn!(
                        "Short write: wrote {} of {} bytes",
                        n,
                        block.len() - written
                    );
                }
                written += n;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Copy `size` bytes from `reader` to `path` at `offset` with default
/// options
///
/// See [`Receiver::receive`].
pub fn receive<P, R>(
    path: P,
    reader: &mut R,
    size: u64,
    offset: u64,
    progress: Option<&dyn Progress>,
) -> Result<u64>
where
    P: AsRef<Path>,
    R: Read + ?Sized,
{
    Receiver::new(ReceiveOptions::default())?.receive(path, reader, size, offset, progress)
}
