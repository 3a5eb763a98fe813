/// Trait for the SPI bus the reader chip is attached to.
/// Implement this trait for different backends (esp-idf, rppal, mocks).
pub trait SpiTransport {
    /// Error type for bus operations
    type Error: std::fmt::Debug;

    /// Write bytes to the device, ignoring anything it clocks back
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Full-duplex transfer: clock out `write` while filling `read`
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error>;
}
