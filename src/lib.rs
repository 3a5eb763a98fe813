//! MFRC522 contactless card reader driver with a serial UID reporting loop.
//!
//! # Features
//!
//! - `spi-esp32` - SPI transport for ESP32 using esp-idf-svc
//! - `rppal` - SPI transport for Raspberry Pi using the rppal crate
//!
//! # Example
//!
//! ```ignore
//! use rc522_rfid::{Mfrc522, ReaderSession, RppalStatusPin, RppalTransport, StatusLed};
//! use rppal::gpio::Gpio;
//! use rppal::spi::{Bus, SlaveSelect};
//!
//! let transport = RppalTransport::new(Bus::Spi0, SlaveSelect::Ss0, 1_000_000)?;
//! let led = StatusLed::new(RppalStatusPin::new(Gpio::new()?.get(4)?.into_output()));
//!
//! ReaderSession::new(Mfrc522::new(transport), led, std::io::stdout().lock()).run();
//! ```

mod reader;
mod session;
mod status;
mod transport;
mod types;

#[cfg(feature = "spi-esp32")]
mod esp32;

#[cfg(feature = "rppal")]
mod rpi;

// Re-exports
pub use reader::Mfrc522;
pub use session::{
    LINE_BOOT_OK, LINE_INITIALIZING, LINE_READER_ERROR, LINE_READER_OK, LINE_READY, ReaderSession,
    SessionConfig, UID_PREFIX,
};
pub use status::{StatusLed, StatusPin};
pub use transport::SpiTransport;
pub use types::{BlinkPattern, CardUid, RfidError};

#[cfg(feature = "spi-esp32")]
pub use esp32::{Esp32StatusPin, Esp32Transport};

#[cfg(feature = "rppal")]
pub use rpi::{RppalStatusPin, RppalTransport};
