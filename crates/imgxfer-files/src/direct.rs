//! Files opened for direct (unbuffered) I/O.
//!
//! A [`DirectFile`] wraps a [`File`] opened with `O_DIRECT`. While direct
//! I/O is enabled every read and write must use a buffer from
//! [`AlignedBuffer`](crate::AlignedBuffer), a length that is a multiple of
//! 512 bytes and a file offset that is a multiple of 512 bytes. The handle
//! rejects misaligned buffers itself, instead of letting the kernel fail
//! with an opaque `EINVAL`.
//!
//! Direct I/O can be toggled on an open handle with [`DirectFile::enable`]
//! and [`DirectFile::disable`], for targets that cannot honor the alignment
//! rules.

use crate::SECTOR_SIZE;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

/// File handle with `O_DIRECT` enabled or disabled
#[derive(Debug)]
pub struct DirectFile {
    file: File,
    direct: bool,
}

impl DirectFile {
    /// Open `path` with `options` plus `O_DIRECT`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use imgxfer_files::DirectFile;
    /// use std::fs::OpenOptions;
    ///
    /// let file = DirectFile::open("/var/tmp/disk.raw", OpenOptions::new().write(true)).unwrap();
    /// assert!(file.is_direct());
    /// ```
    pub fn open<P: AsRef<Path>>(path: P, options: &OpenOptions) -> io::Result<Self> {
        let mut options = options.clone();
        options.custom_flags(libc::O_DIRECT);
        let file = options.open(path)?;
        Ok(Self { file, direct: true })
    }

    /// Open `path` with `O_DIRECT`, falling back to buffered I/O when the
    /// filesystem does not support direct I/O (for example tmpfs on older
    /// kernels)
    pub fn open_or_buffered<P: AsRef<Path>>(path: P, options: &OpenOptions) -> io::Result<Self> {
        let path = path.as_ref();
        match Self::open(path, options) {
            Err(e) if e.raw_os_error() == Some(libc::EINVAL) => {
                tracing::warn!(
                    "Direct I/O not supported for {}, using buffered I/O",
                    path.display()
                );
                let file = options.open(path)?;
                Ok(Self {
                    file,
                    direct: false,
                })
            }
            other => other,
        }
    }

    /// Wrap an already open file, detecting whether `O_DIRECT` is set
    pub fn from_file(file: File) -> io::Result<Self> {
        let flags = get_flags(file.as_raw_fd())?;
        Ok(Self {
            file,
            direct: flags & libc::O_DIRECT != 0,
        })
    }

    /// Enable direct I/O
    ///
    /// Reads and writes must use aligned buffers afterwards.
    pub fn enable(&mut self) -> io::Result<()> {
        self.set_direct(true)
    }

    /// Disable direct I/O
    ///
    /// Reads and writes may use unaligned buffers afterwards.
    pub fn disable(&mut self) -> io::Result<()> {
        self.set_direct(false)
    }

    fn set_direct(&mut self, enable: bool) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let flags = get_flags(fd)?;
        let flags = if enable {
            flags | libc::O_DIRECT
        } else {
            flags & !libc::O_DIRECT
        };
        // SAFETY: fd belongs to self.file, which stays open for the call.
        if unsafe { libc::fcntl(fd, libc::F_SETFL, flags) } < 0 {
            return Err(io::Error::last_os_error());
        }
        self.direct = enable;
        Ok(())
    }

    /// Check if direct I/O is enabled
    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Flush data and metadata to stable storage
    pub fn sync_all(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Get a reference to the underlying file
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Unwrap into the underlying file
    pub fn into_inner(self) -> File {
        self.file
    }

    fn check_aligned(&self, buf: &[u8]) -> io::Result<()> {
        if self.direct
            && (buf.as_ptr() as usize % SECTOR_SIZE != 0 || buf.len() % SECTOR_SIZE != 0)
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "direct I/O requires {SECTOR_SIZE} byte aligned buffers (address {:p}, length {})",
                    buf.as_ptr(),
                    buf.len()
                ),
            ));
        }
        Ok(())
    }
}

fn get_flags(fd: RawFd) -> io::Result<libc::c_int> {
    // SAFETY: F_GETFL only reads descriptor flags; fd is open.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(flags)
}

impl Read for DirectFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check_aligned(buf)?;
        self.file.read(buf)
    }
}

impl Write for DirectFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_aligned(buf)?;
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for DirectFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl AsRawFd for DirectFile {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}
