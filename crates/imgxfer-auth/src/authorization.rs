//! Activated tickets.
//!
//! An [`Authorization`] is a ticket bound to an absolute expiry instant and
//! a parsed target url. The expiry is computed once, when the ticket is
//! activated, and is never extended.

use crate::error::{AuthError, Denial, Result};
use crate::ticket::{Operation, Ticket};
use std::time::{Duration, Instant};
use url::Url;

/// Url schemes we can serve
pub const SUPPORTED_SCHEMES: &[&str] = &["file"];

/// Authorization derived from an activated ticket
#[derive(Debug, Clone)]
pub struct Authorization {
    ticket: Ticket,
    expires: Instant,
    url: Url,
}

impl Authorization {
    /// Activate `ticket` now
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidLocator`] if the ticket url does not
    /// parse, or [`AuthError::UnsupportedLocator`] if its scheme is not
    /// one of [`SUPPORTED_SCHEMES`].
    pub fn new(ticket: Ticket) -> Result<Self> {
        Self::activated_at(ticket, Instant::now())
    }

    /// Activate `ticket` as if at instant `now`
    ///
    /// # Errors
    ///
    /// As [`Authorization::new`], plus [`AuthError::MalformedTicket`] if the
    /// expiry instant is not representable.
    pub fn activated_at(ticket: Ticket, now: Instant) -> Result<Self> {
        let url = resolve(ticket.url())?;
        let expires = now.checked_add(ticket.timeout()).ok_or_else(|| {
            AuthError::MalformedTicket(format!(
                "timeout out of range: {}",
                ticket.timeout().as_secs()
            ))
        })?;
        Ok(Self {
            ticket,
            expires,
            url,
        })
    }

    /// Check if the caller may read up to `size` bytes
    ///
    /// Returns the url the caller may read from.
    pub fn read(&self, size: u64) -> Result<Url> {
        self.check(Operation::Read, size)
    }

    /// Check if the caller may write up to `size` bytes
    ///
    /// Returns the url the caller may write to.
    pub fn write(&self, size: u64) -> Result<Url> {
        self.check(Operation::Write, size)
    }

    /// Check `op` of `size` bytes against the current time
    pub fn check(&self, op: Operation, size: u64) -> Result<Url> {
        self.check_at(op, size, Instant::now())
    }

    /// Check `op` of `size` bytes as if at instant `now`
    ///
    /// The instant equal to the expiry is still valid.
    pub fn check_at(&self, op: Operation, size: u64, now: Instant) -> Result<Url> {
        if !self.ticket.mode().allows(op) {
            return Err(Denial::OperationNotAllowed(op.as_char()).into());
        }
        if size > self.ticket.size() {
            return Err(Denial::SizeOutOfRange {
                requested: size,
                allowed: self.ticket.size(),
            }
            .into());
        }
        if now > self.expires {
            return Err(Denial::Expired(now - self.expires).into());
        }
        Ok(self.url.clone())
    }

    /// The activated ticket
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }

    /// Instant after which checks are denied
    pub fn expires(&self) -> Instant {
        self.expires
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        self.expires.saturating_duration_since(Instant::now())
    }

    /// Resolved target url
    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn resolve(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| AuthError::InvalidLocator {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(AuthError::UnsupportedLocator(url.scheme().to_string()));
    }
    Ok(url)
}
