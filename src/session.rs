//! Boot, self-test and the poll-report loop around the reader

use log::{debug, error, warn};
use std::fmt;
use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::reader::Mfrc522;
use crate::status::{StatusLed, StatusPin};
use crate::transport::SpiTransport;
use crate::types::{BlinkPattern, CardUid, RfidError};

/// Emitted once the output channel has settled.
pub const LINE_BOOT_OK: &str = "ESP32_BOOT_OK";
/// Emitted before peripheral setup begins.
pub const LINE_INITIALIZING: &str = "RFID_INITIALIZING";
/// Emitted when the self-test fails; the fault loop follows.
pub const LINE_READER_ERROR: &str = "RC522_ERROR";
/// Emitted when the self-test passes.
pub const LINE_READER_OK: &str = "RC522_OK";
/// Emitted when the reader is ready for polling.
pub const LINE_READY: &str = "RFID_READY";
/// Prefix of every reported card identifier line, e.g. `RFID:04A3BC1D`.
pub const UID_PREFIX: &str = "RFID:";

/// Timing and signalling parameters of the reporting loop.
///
/// `Default` carries the fixed values the deployed reader runs with; tests
/// substitute shorter intervals and zero-length blink pulses.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Grace period before the first line, giving the serial host time to attach
    pub boot_settle: Duration,
    /// Idle pause between empty poll cycles
    pub poll_interval: Duration,
    /// Pause after a reported card, so a still-present card is not re-read in a tight loop
    pub debounce: Duration,
    /// Pause between fault blink bursts
    pub fault_interval: Duration,
    pub startup_pattern: BlinkPattern,
    pub read_pattern: BlinkPattern,
    pub fault_pattern: BlinkPattern,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            boot_settle: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(30),
            debounce: Duration::from_millis(500),
            fault_interval: Duration::from_millis(1000),
            startup_pattern: BlinkPattern::STARTUP,
            read_pattern: BlinkPattern::READ_OK,
            fault_pattern: BlinkPattern::FAULT,
        }
    }
}

/// Owns the reader, the status LED and the serial output channel, and runs
/// the detect / report / halt / debounce cycle forever.
pub struct ReaderSession<T: SpiTransport, P: StatusPin, W: Write> {
    reader: Mfrc522<T>,
    led: StatusLed<P>,
    out: W,
    config: SessionConfig,
}

impl<T: SpiTransport, P: StatusPin, W: Write> ReaderSession<T, P, W> {
    pub fn new(reader: Mfrc522<T>, led: StatusLed<P>, out: W) -> Self {
        Self::with_config(reader, led, out, SessionConfig::default())
    }

    pub fn with_config(
        reader: Mfrc522<T>,
        led: StatusLed<P>,
        out: W,
        config: SessionConfig,
    ) -> Self {
        Self {
            reader,
            led,
            out,
            config,
        }
    }

    /// Bring up the reader and run its self-test, reporting progress on the
    /// output channel.
    ///
    /// On success the startup blink pattern is shown and the session is
    /// ready for [`poll_once`](Self::poll_once). On failure `RC522_ERROR`
    /// has been emitted and the reader must be considered unusable.
    pub fn initialize(&mut self) -> Result<(), RfidError> {
        thread::sleep(self.config.boot_settle);
        self.report(LINE_BOOT_OK);
        self.report(LINE_INITIALIZING);

        match self.bring_up() {
            Ok(()) => {
                self.report(LINE_READER_OK);
                self.report(LINE_READY);
                self.led.signal(self.config.startup_pattern);
                Ok(())
            }
            Err(err) => {
                self.report(LINE_READER_ERROR);
                Err(err)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), RfidError> {
        self.reader.init()?;
        match self.reader.version()? {
            v @ (0x00 | 0xFF) => Err(RfidError::NoDevice(v)),
            version => {
                debug!("reader self-test passed, version 0x{version:02X}");
                Ok(())
            }
        }
    }

    /// Run one poll cycle.
    ///
    /// An empty field, a card pulled away mid-read and a bus glitch all look
    /// the same from outside: nothing is emitted and `None` comes back after
    /// the idle pause. A fully read card is reported as one `RFID:<HEX>`
    /// line, signalled on the LED, halted, and followed by the debounce
    /// pause.
    pub fn poll_once(&mut self) -> Option<CardUid> {
        match self.try_read_card() {
            Ok(Some(uid)) => {
                self.report(format_args!("{UID_PREFIX}{uid}"));
                self.led.signal(self.config.read_pattern);

                // Halt the card and drop the crypto session so the chip can
                // detect the next card, including one with the same UID
                if let Err(err) = self.reader.halt_a() {
                    debug!("halt failed: {err}");
                }
                if let Err(err) = self.reader.stop_crypto1() {
                    debug!("stop crypto failed: {err}");
                }

                thread::sleep(self.config.debounce);
                Some(uid)
            }
            Ok(None) => {
                thread::sleep(self.config.poll_interval);
                None
            }
            Err(err) => {
                debug!("poll cycle absorbed: {err}");
                thread::sleep(self.config.poll_interval);
                None
            }
        }
    }

    fn try_read_card(&mut self) -> Result<Option<CardUid>, RfidError> {
        if !self.reader.new_card_present()? {
            return Ok(None);
        }
        self.reader.read_card_serial().map(Some)
    }

    /// Run forever: initialize, then poll. A failed self-test drops into the
    /// fault loop; the only way out of either loop is a reset.
    pub fn run(mut self) -> ! {
        if let Err(err) = self.initialize() {
            error!("reader initialization failed: {err}");
            self.fault_loop();
        }
        loop {
            self.poll_once();
        }
    }

    fn fault_loop(&mut self) -> ! {
        loop {
            self.led.signal(self.config.fault_pattern);
            thread::sleep(self.config.fault_interval);
        }
    }

    fn report(&mut self, line: impl fmt::Display) {
        // The output channel is the only reporting surface there is, so a
        // failed write can only go to the logger
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!("serial write failed: {err}");
        } else if let Err(err) = self.out.flush() {
            warn!("serial flush failed: {err}");
        }
    }
}
