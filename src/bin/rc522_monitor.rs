//! Polls an MFRC522 on SPI0/CE0 and reports card UIDs on stdout, one
//! `RFID:<HEX>` line per presented card.

use rc522_rfid::{Mfrc522, ReaderSession, RppalStatusPin, RppalTransport, StatusLed};
use rppal::gpio::Gpio;
use rppal::spi::{Bus, SlaveSelect};
use std::error::Error;
use std::io;

// BCM pin driving the status LED
const LED_PIN: u8 = 4;
const SPI_CLOCK_HZ: u32 = 1_000_000;

fn main() -> Result<(), Box<dyn Error>> {
    let transport = RppalTransport::new(Bus::Spi0, SlaveSelect::Ss0, SPI_CLOCK_HZ)?;
    let led_pin = Gpio::new()?.get(LED_PIN)?.into_output();

    let reader = Mfrc522::new(transport);
    let led = StatusLed::new(RppalStatusPin::new(led_pin));

    ReaderSession::new(reader, led, io::stdout().lock()).run()
}
