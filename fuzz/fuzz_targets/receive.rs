//! Fuzz test for the receive loop
//!
//! Arbitrary sizes, offsets and source lengths must either copy exactly
//! the requested bytes or fail cleanly.

#![no_main]

use arbitrary::Arbitrary;
use imgxfer_files::{FileError, ReceiveOptions, Receiver};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

#[derive(Debug, Arbitrary)]
struct Input {
    size: u16,
    offset: u16,
    chunk_sectors: u8,
    data: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let Ok(file) = tempfile::NamedTempFile::new() else {
        return;
    };
    let size = u64::from(input.size);
    let offset = u64::from(input.offset);
    let options = ReceiveOptions {
        chunk_size: 512 * (usize::from(input.chunk_sectors) + 1),
        alignment: 512,
        buffered_fallback: true,
    };
    let Ok(mut receiver) = Receiver::new(options) else {
        panic!("sector sized options must be accepted");
    };

    let mut source = Cursor::new(&input.data);
    match receiver.receive(file.path(), &mut source, size, offset, None) {
        Ok(n) => {
            assert_eq!(n, size);
            let written = std::fs::read(file.path()).unwrap_or_default();
            let start = offset as usize;
            assert_eq!(&written[start..start + n as usize], &input.data[..n as usize]);
        }
        Err(FileError::InvalidArgument(_)) => {
            assert!(size % 512 != 0 || offset % 512 != 0);
        }
        Err(FileError::SourceExhausted { received, .. }) => {
            assert!((input.data.len() as u64) < size);
            assert!(received <= input.data.len() as u64);
        }
        Err(FileError::Io(_)) => {}
    }
});
