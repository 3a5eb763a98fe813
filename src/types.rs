//! Types for card reader operations

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Unique identifier of a detected card.
///
/// ISO 14443-3 Type A cards carry a single (4 byte), double (7 byte) or
/// triple (10 byte) size UID. `Display` renders the identifier as uppercase
/// hex with no separators, e.g. `04A3BC1D`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUid {
    bytes: Vec<u8>,
}

impl CardUid {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw UID bytes as returned by the card.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_hex(&self.bytes))
    }
}

/// Errors that can occur while talking to the reader chip or a card.
#[derive(Debug, Error)]
pub enum RfidError {
    /// Bus layer error (SPI transfer failed)
    #[error("transport error: {0}")]
    Transport(String),
    /// No card answered within the transceive deadline
    #[error("no response from card")]
    Timeout,
    /// The chip flagged a communication error (ErrorReg bits)
    #[error("card communication error (ErrorReg 0x{0:02X})")]
    Protocol(u8),
    /// More than one card answered the anticollision frame
    #[error("collision during anticollision")]
    Collision,
    /// UID check byte did not match the received UID bytes
    #[error("UID check byte mismatch")]
    BccMismatch,
    /// A card answered with a frame we cannot make sense of
    #[error("unexpected response: {0}")]
    UnexpectedResponse(&'static str),
    /// Version register read back a reserved sentinel, reader absent or miswired
    #[error("reader self-test failed (version register 0x{0:02X})")]
    NoDevice(u8),
}

/// A blocking LED signalling sequence: `times` pulses of `on` then `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub times: u8,
    pub on: Duration,
    pub off: Duration,
}

impl BlinkPattern {
    pub const fn new(times: u8, on_ms: u64, off_ms: u64) -> Self {
        Self {
            times,
            on: Duration::from_millis(on_ms),
            off: Duration::from_millis(off_ms),
        }
    }

    /// Shown once after a successful boot and self-test.
    pub const STARTUP: BlinkPattern = BlinkPattern::new(2, 200, 200);
    /// Shown after every successfully read card.
    pub const READ_OK: BlinkPattern = BlinkPattern::new(3, 100, 100);
    /// Repeated forever when the reader fails its self-test.
    pub const FAULT: BlinkPattern = BlinkPattern::new(10, 50, 50);
}

/// Convert bytes to uppercase hex string
pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}
