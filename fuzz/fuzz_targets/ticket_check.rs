//! Fuzz test for authorization checks
//!
//! Compares every check against the mode, size and expiry rules.

#![no_main]

use arbitrary::Arbitrary;
use imgxfer_auth::{Authorization, Mode, Operation, Ticket};
use libfuzzer_sys::fuzz_target;
use std::time::{Duration, Instant};

#[derive(Debug, Arbitrary)]
struct Input {
    mode: u8,
    write: bool,
    size: u64,
    requested: u64,
    timeout: u32,
    elapsed_ms: u64,
}

fuzz_target!(|input: Input| {
    let mode = match input.mode % 3 {
        0 => Mode::Read,
        1 => Mode::Write,
        _ => Mode::ReadWrite,
    };
    let op = if input.write {
        Operation::Write
    } else {
        Operation::Read
    };
    let timeout = u64::from(input.timeout);

    let Ok(ticket) = Ticket::new(mode, input.size, "file:///image", "uuid", timeout) else {
        assert!(input.size == 0 || timeout == 0);
        return;
    };

    let start = Instant::now();
    let Ok(auth) = Authorization::activated_at(ticket, start) else {
        panic!("file url must activate");
    };
    let elapsed = Duration::from_millis(input.elapsed_ms % (1 << 40));

    let allowed = mode.allows(op)
        && input.requested <= input.size
        && elapsed <= Duration::from_secs(timeout);
    assert_eq!(auth.check_at(op, input.requested, start + elapsed).is_ok(), allowed);
});
