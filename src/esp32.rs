//! SPI transport and status pin for ESP32 using esp-idf-svc

use crate::status::StatusPin;
use crate::transport::SpiTransport;
use esp_idf_svc::hal::gpio::{InputPin, Output, OutputPin, PinDriver};
use esp_idf_svc::hal::peripheral::Peripheral;
use esp_idf_svc::hal::spi::{self, SpiAnyPins, SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use log::warn;

pub struct Esp32Transport<'a> {
    spi: SpiDeviceDriver<'a, SpiDriver<'a>>,
}

impl<'a> Esp32Transport<'a> {
    /// Claim an SPI peripheral and open a device on it.
    ///
    /// The deployed wiring uses the VSPI defaults: SCK on GPIO 18, MISO on
    /// GPIO 19, MOSI on GPIO 23, chip select on GPIO 5.
    pub fn new(
        spi: impl Peripheral<P = impl SpiAnyPins> + 'a,
        sclk: impl Peripheral<P = impl OutputPin> + 'a,
        sdo: impl Peripheral<P = impl OutputPin> + 'a,
        sdi: impl Peripheral<P = impl InputPin + OutputPin> + 'a,
        cs: impl Peripheral<P = impl OutputPin> + 'a,
        baud_rate: u32,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let driver = SpiDriver::new(spi, sclk, sdo, Some(sdi), &SpiDriverConfig::new())?;
        let config = spi::config::Config::new().baudrate(baud_rate.into());
        let spi = SpiDeviceDriver::new(driver, Some(cs), &config)?;

        Ok(Self { spi })
    }
}

impl SpiTransport for Esp32Transport<'_> {
    type Error = esp_idf_svc::sys::EspError;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(data)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.spi.transfer(read, write)
    }
}

/// Status LED on a GPIO output. The deployed board drives it on GPIO 4.
pub struct Esp32StatusPin<'a, P: OutputPin> {
    pin: PinDriver<'a, P, Output>,
}

impl<'a, P: OutputPin> Esp32StatusPin<'a, P> {
    pub fn new(pin: impl Peripheral<P = P> + 'a) -> Result<Self, esp_idf_svc::sys::EspError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        Ok(Self { pin })
    }
}

impl<P: OutputPin> StatusPin for Esp32StatusPin<'_, P> {
    fn set_high(&mut self) {
        if let Err(err) = self.pin.set_high() {
            warn!("status pin write failed: {err:?}");
        }
    }

    fn set_low(&mut self) {
        if let Err(err) = self.pin.set_low() {
            warn!("status pin write failed: {err:?}");
        }
    }
}
