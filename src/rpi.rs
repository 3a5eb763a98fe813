//! SPI transport and status pin for Raspberry Pi using the rppal crate

use crate::status::StatusPin;
use crate::transport::SpiTransport;
use rppal::gpio::OutputPin;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

pub struct RppalTransport {
    spi: Spi,
}

impl RppalTransport {
    /// Open an SPI slave in Mode 0, the chip's native mode. 1 MHz is a safe
    /// clock for breadboard wiring.
    pub fn new(
        bus: Bus,
        slave: SlaveSelect,
        clock_speed_hz: u32,
    ) -> Result<Self, rppal::spi::Error> {
        let spi = Spi::new(bus, slave, clock_speed_hz, Mode::Mode0)?;

        Ok(Self { spi })
    }
}

impl SpiTransport for RppalTransport {
    type Error = rppal::spi::Error;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(data).map(|_| ())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.spi.transfer(read, write).map(|_| ())
    }
}

pub struct RppalStatusPin {
    pin: OutputPin,
}

impl RppalStatusPin {
    pub fn new(mut pin: OutputPin) -> Self {
        pin.set_low();
        Self { pin }
    }
}

impl StatusPin for RppalStatusPin {
    fn set_high(&mut self) {
        self.pin.set_high();
    }

    fn set_low(&mut self) {
        self.pin.set_low();
    }
}
