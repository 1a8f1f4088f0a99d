//! End-to-end tests: activate a ticket, authorize a write, receive the data.

use imgxfer_auth::{AuthError, Denial, Registry, Ticket};
use imgxfer_files::{FileError, ReceiveOptions, Receiver, receive};
use imgxfer_integration_tests::{create_file, pattern, random_reader, ticket_json};
use std::fs;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};

const UUID: &str = "3facfbc1-68e0-4b77-b0c6-87e66fcabcc2";

/// Authorize a write of `size` bytes for the ticket and receive `data`
/// into the authorized path
fn put(registry: &Registry, uuid: &str, data: &[u8]) -> Result<u64, String> {
    let url = registry
        .check_write(uuid, data.len() as u64)
        .map_err(|e| e.to_string())?;
    receive(url.path(), &mut Cursor::new(data), data.len() as u64, 0, None)
        .map_err(|e| e.to_string())
}

#[test]
fn test_receive_full() {
    const SIZE: u64 = 1024 * 1234;
    let image = create_file(SIZE).unwrap();
    let buf = pattern(SIZE as usize);

    let n = receive(image.path(), &mut Cursor::new(&buf), SIZE, 0, None).unwrap();
    assert_eq!(n, SIZE);
    assert_eq!(fs::read(image.path()).unwrap(), buf);
}

#[test]
fn test_receive_random() {
    const SIZE: u64 = 1024 * 1234;
    let image = create_file(SIZE).unwrap();
    let buf = pattern(SIZE as usize);

    let mut reader = random_reader(Cursor::new(&buf));
    let n = receive(image.path(), &mut reader, SIZE, 0, None).unwrap();
    assert_eq!(n, SIZE);
    assert_eq!(fs::read(image.path()).unwrap(), buf);
}

#[test]
fn test_receive_random_small_chunks() {
    const SIZE: u64 = 1024 * 1234;
    let image = create_file(SIZE).unwrap();
    let buf = pattern(SIZE as usize);

    // 1234 KiB is not a multiple of the chunk size
    let mut receiver = Receiver::new(ReceiveOptions {
        chunk_size: 64 * 1024,
        ..ReceiveOptions::default()
    })
    .unwrap();
    let progress = AtomicU64::new(0);

    let n = receiver
        .receive(
            image.path(),
            &mut random_reader(Cursor::new(&buf)),
            SIZE,
            0,
            Some(&progress),
        )
        .unwrap();
    assert_eq!(n, SIZE);
    assert_eq!(progress.load(Ordering::Relaxed), SIZE);
    assert_eq!(fs::read(image.path()).unwrap(), buf);
}

#[test]
fn test_receive_offset() {
    let image = create_file(512 * 3).unwrap();
    let buf = pattern(512);

    let n = receive(image.path(), &mut Cursor::new(&buf), 512, 512, None).unwrap();
    assert_eq!(n, 512);

    let content = fs::read(image.path()).unwrap();
    let empty = vec![0u8; 512];
    assert_eq!(&content[..512], &empty[..]);
    assert_eq!(&content[512..1024], &buf[..]);
    assert_eq!(&content[1024..], &empty[..]);
}

#[test]
fn test_receive_unaligned_size() {
    let image = create_file(511).unwrap();
    let buf = pattern(511);

    let err = receive(image.path(), &mut Cursor::new(&buf), 511, 0, None).unwrap_err();
    assert!(matches!(err, FileError::InvalidArgument(_)));
    assert_eq!(fs::read(image.path()).unwrap(), vec![0u8; 511]);
}

#[test]
fn test_receive_unaligned_offset() {
    let image = create_file(1024).unwrap();
    let buf = pattern(512);

    let mut reader = Cursor::new(&buf);
    let err = receive(image.path(), &mut reader, 512, 511, None).unwrap_err();
    assert!(matches!(err, FileError::InvalidArgument(_)));
    // Nothing consumed, nothing written
    assert_eq!(reader.position(), 0);
    assert_eq!(fs::read(image.path()).unwrap(), vec![0u8; 1024]);
}

#[test]
fn test_put_with_ticket() {
    const SIZE: u64 = 1024 * 1024;
    let image = create_file(SIZE).unwrap();
    let data = pattern(SIZE as usize);

    let registry = Registry::new();
    let ticket = Ticket::parse(ticket_json("rw", SIZE, image.path(), UUID, 300).as_bytes())
        .unwrap();
    registry.activate(ticket).unwrap();

    assert_eq!(put(&registry, UUID, &data).unwrap(), SIZE);
    assert_eq!(fs::read(image.path()).unwrap(), data);
}

#[test]
fn test_put_read_only_ticket() {
    let image = create_file(4096).unwrap();
    let registry = Registry::new();
    let ticket =
        Ticket::parse(ticket_json("r", 4096, image.path(), UUID, 300).as_bytes()).unwrap();
    registry.activate(ticket).unwrap();

    let err = registry.check_write(UUID, 4096).unwrap_err();
    assert_eq!(err, AuthError::Forbidden(Denial::OperationNotAllowed('w')));

    let url = registry.check_read(UUID, 4096).unwrap();
    assert_eq!(url.path(), image.path().to_str().unwrap());
}

#[test]
fn test_put_larger_than_ticket() {
    let image = create_file(8192).unwrap();
    let registry = Registry::new();
    let ticket =
        Ticket::parse(ticket_json("w", 4096, image.path(), UUID, 300).as_bytes()).unwrap();
    registry.activate(ticket).unwrap();

    assert!(put(&registry, UUID, &pattern(8192)).is_err());
    // Denied before any I/O
    assert_eq!(fs::read(image.path()).unwrap(), vec![0u8; 8192]);
}

#[test]
fn test_put_after_revoke() {
    let image = create_file(4096).unwrap();
    let registry = Registry::new();
    let ticket =
        Ticket::parse(ticket_json("w", 4096, image.path(), UUID, 300).as_bytes()).unwrap();
    registry.activate(ticket).unwrap();
    registry.revoke(UUID);

    assert!(registry.check_write(UUID, 4096).unwrap_err().is_not_found());
}

#[test]
fn test_transfer_outlives_revoke() {
    const SIZE: u64 = 64 * 1024;
    let image = create_file(SIZE).unwrap();
    let data = pattern(SIZE as usize);

    let registry = Registry::new();
    let ticket =
        Ticket::parse(ticket_json("w", SIZE, image.path(), UUID, 300).as_bytes()).unwrap();
    registry.activate(ticket).unwrap();

    let url = registry.check_write(UUID, SIZE).unwrap();
    registry.revoke(UUID);

    // The transfer was authorized before the revoke and completes
    let n = receive(url.path(), &mut Cursor::new(&data), SIZE, 0, None).unwrap();
    assert_eq!(n, SIZE);
    assert_eq!(fs::read(image.path()).unwrap(), data);
}

#[test]
fn test_activate_malformed_ticket() {
    let json = r#"{"mode": "rw", "size": 1024, "timeout": 300, "url": "file:///path"}"#;
    assert!(matches!(
        Ticket::parse(json.as_bytes()),
        Err(AuthError::MalformedTicket(_))
    ));
}
