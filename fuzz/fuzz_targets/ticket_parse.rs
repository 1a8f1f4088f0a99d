//! Fuzz test for ticket parsing
//!
//! Arbitrary bytes must parse into a ticket or a malformed ticket error,
//! never panic. Parsed tickets must survive activation.

#![no_main]

use imgxfer_auth::{AuthError, Registry, Ticket};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let ticket = match Ticket::parse(data) {
        Ok(ticket) => ticket,
        Err(AuthError::MalformedTicket(_)) => return,
        Err(e) => panic!("unexpected parse error: {e}"),
    };

    assert!(ticket.size() > 0);
    assert!(!ticket.uuid().is_empty());

    // The url may still be unusable; that is a locator error, not a panic
    let registry = Registry::new();
    let uuid = ticket.uuid().to_string();
    if registry.activate(ticket).is_ok() {
        assert!(registry.lookup(&uuid).is_ok());
    }
});
