use log::debug;
use std::thread;
use std::time::{Duration, Instant};

use crate::transport::SpiTransport;
use crate::types::{CardUid, RfidError};

pub struct Mfrc522<T: SpiTransport> {
    bus: T,
}

impl<T: SpiTransport> Mfrc522<T> {
    // Register addresses, datasheet section 9.2
    const COMMAND_REG: u8 = 0x01;
    const COM_IRQ_REG: u8 = 0x04;
    const ERROR_REG: u8 = 0x06;
    const STATUS2_REG: u8 = 0x08;
    const FIFO_DATA_REG: u8 = 0x09;
    const FIFO_LEVEL_REG: u8 = 0x0A;
    const BIT_FRAMING_REG: u8 = 0x0D;
    const MODE_REG: u8 = 0x11;
    const TX_CONTROL_REG: u8 = 0x14;
    const TX_ASK_REG: u8 = 0x15;
    const T_MODE_REG: u8 = 0x2A;
    const T_PRESCALER_REG: u8 = 0x2B;
    const T_RELOAD_REG_H: u8 = 0x2C;
    const T_RELOAD_REG_L: u8 = 0x2D;
    const VERSION_REG: u8 = 0x37;

    // Chip commands, datasheet section 10.3
    const CMD_IDLE: u8 = 0x00;
    const CMD_TRANSCEIVE: u8 = 0x0C;
    const CMD_SOFT_RESET: u8 = 0x0F;

    // ComIrqReg bits
    const IRQ_RX: u8 = 0x20;
    const IRQ_IDLE: u8 = 0x10;
    const IRQ_TIMER: u8 = 0x01;

    // ErrorReg bits: BufferOvfl | ParityErr | ProtocolErr, and CollErr
    const ERR_FATAL: u8 = 0x13;
    const ERR_COLLISION: u8 = 0x08;

    // Card (PICC) commands, ISO 14443-3
    const PICC_REQA: u8 = 0x26;
    const PICC_WUPA: u8 = 0x52;
    const PICC_CT: u8 = 0x88;
    const PICC_SEL_CL: [u8; 3] = [0x93, 0x95, 0x97];
    const PICC_HLTA: u8 = 0x50;

    const MAX_FIFO_BYTES: usize = 64;
    // Host-side backstop; the chip timer (25 ms reload) normally fires first
    const TRANSCEIVE_DEADLINE: Duration = Duration::from_millis(40);

    /// Create a new driver instance on the given SPI bus
    pub fn new(bus: T) -> Self {
        Self { bus }
    }

    /// Soft-reset the chip and bring it into a state where cards can be polled
    pub fn init(&mut self) -> Result<(), RfidError> {
        self.write_reg(Self::COMMAND_REG, Self::CMD_SOFT_RESET)?;
        thread::sleep(Duration::from_millis(50));

        // Countdown timer: auto-start after transmission, ~25 us per tick
        // (prescaler 0xA9), reload 0x03E8 for a 25 ms transceive timeout
        self.write_reg(Self::T_MODE_REG, 0x80)?;
        self.write_reg(Self::T_PRESCALER_REG, 0xA9)?;
        self.write_reg(Self::T_RELOAD_REG_H, 0x03)?;
        self.write_reg(Self::T_RELOAD_REG_L, 0xE8)?;

        // Force 100% ASK modulation
        self.write_reg(Self::TX_ASK_REG, 0x40)?;
        // CRC coprocessor preset 0x6363, transmitter waits for the RF field
        self.write_reg(Self::MODE_REG, 0x3D)?;
        // Tx1RFEn | Tx2RFEn: antenna on
        self.read_write(Self::TX_CONTROL_REG, |v| v | 0x03)?;
        Ok(())
    }

    /// Read the hardware version register.
    ///
    /// A live chip reads back a vendor version such as 0x91 or 0x92; an
    /// absent or miswired chip floats the bus to 0x00 or 0xFF.
    pub fn version(&mut self) -> Result<u8, RfidError> {
        self.read_reg(Self::VERSION_REG)
    }

    /// Check whether a card that is not halted is in the field.
    ///
    /// Timeouts mean no card; a collision means more than one card, which
    /// still counts as present.
    pub fn new_card_present(&mut self) -> Result<bool, RfidError> {
        match self.request_a() {
            Ok(_) => Ok(true),
            Err(RfidError::Timeout) => Ok(false),
            Err(RfidError::Collision) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// REQA short frame. Halted cards do not answer this.
    pub fn request_a(&mut self) -> Result<[u8; 2], RfidError> {
        self.short_frame(Self::PICC_REQA)
    }

    /// WUPA short frame. Also brings halted cards back to the ready state.
    pub fn wakeup(&mut self) -> Result<[u8; 2], RfidError> {
        self.short_frame(Self::PICC_WUPA)
    }

    /// Run the anticollision/select cascade and return the card's UID.
    ///
    /// Walks cascade levels 1-3, so single (4 byte), double (7 byte) and
    /// triple (10 byte) size UIDs are all handled. The card must have
    /// answered REQA/WUPA immediately before.
    pub fn read_card_serial(&mut self) -> Result<CardUid, RfidError> {
        let mut uid = Vec::with_capacity(10);

        for &sel in &Self::PICC_SEL_CL {
            // Anticollision: SEL + NVB 0x20 returns uid0..uid3 + BCC
            let frame = self.transceive(&[sel, 0x20], 0)?;
            if frame.len() != 5 {
                return Err(RfidError::UnexpectedResponse("anticollision frame is five bytes"));
            }
            if frame[0] ^ frame[1] ^ frame[2] ^ frame[3] != frame[4] {
                return Err(RfidError::BccMismatch);
            }

            // Select: SEL + NVB 0x70 + the five bytes as received + CRC_A
            let mut select = Vec::with_capacity(9);
            select.push(sel);
            select.push(0x70);
            select.extend_from_slice(&frame);
            let crc = crc_a(&select);
            select.extend_from_slice(&crc);

            let sak = self.transceive(&select, 0)?;
            if sak.is_empty() {
                return Err(RfidError::UnexpectedResponse("select returned no SAK"));
            }

            if sak[0] & 0x04 == 0 {
                uid.extend_from_slice(&frame[0..4]);
                debug!("selected card, uid {:02X?}", uid);
                return Ok(CardUid::new(uid));
            }

            // Cascade bit set: the first byte was the cascade tag, the UID
            // continues at the next level
            if frame[0] != Self::PICC_CT {
                return Err(RfidError::UnexpectedResponse("cascade SAK without cascade tag"));
            }
            uid.extend_from_slice(&frame[1..4]);
        }

        Err(RfidError::UnexpectedResponse("cascade past triple-size UID"))
    }

    /// Halt the selected card so the next REQA poll does not see it again.
    ///
    /// ISO 14443-3: the card acknowledges HLTA by staying silent, so a
    /// timeout is the success case here.
    pub fn halt_a(&mut self) -> Result<(), RfidError> {
        let mut frame = vec![Self::PICC_HLTA, 0x00];
        let crc = crc_a(&frame);
        frame.extend_from_slice(&crc);

        match self.transceive(&frame, 0) {
            Err(RfidError::Timeout) => Ok(()),
            Ok(_) => Err(RfidError::UnexpectedResponse("card answered HLTA")),
            Err(e) => Err(e),
        }
    }

    /// Clear the MFCrypto1On flag so the chip can talk to the next card
    pub fn stop_crypto1(&mut self) -> Result<(), RfidError> {
        self.read_write(Self::STATUS2_REG, |v| v & !0x08)
    }

    fn short_frame(&mut self, cmd: u8) -> Result<[u8; 2], RfidError> {
        // REQA/WUPA are 7-bit short frames
        let resp = self.transceive(&[cmd], 7)?;
        if resp.len() != 2 {
            return Err(RfidError::UnexpectedResponse("ATQA is two bytes"));
        }
        Ok([resp[0], resp[1]])
    }

    fn transceive(&mut self, send: &[u8], tx_last_bits: u8) -> Result<Vec<u8>, RfidError> {
        self.write_reg(Self::COM_IRQ_REG, 0x7F)?;
        self.write_reg(Self::FIFO_LEVEL_REG, 0x80)?;
        self.write_reg(Self::COMMAND_REG, Self::CMD_IDLE)?;

        for &b in send {
            self.write_reg(Self::FIFO_DATA_REG, b)?;
        }

        self.write_reg(Self::BIT_FRAMING_REG, tx_last_bits & 0x07)?;
        self.write_reg(Self::COMMAND_REG, Self::CMD_TRANSCEIVE)?;
        // StartSend
        self.read_write(Self::BIT_FRAMING_REG, |v| v | 0x80)?;

        let deadline = Instant::now() + Self::TRANSCEIVE_DEADLINE;
        let timed_out = loop {
            let irq = self.read_reg(Self::COM_IRQ_REG)?;
            if irq & (Self::IRQ_RX | Self::IRQ_IDLE) != 0 {
                break false;
            }
            if irq & Self::IRQ_TIMER != 0 || Instant::now() > deadline {
                break true;
            }
        };

        self.read_write(Self::BIT_FRAMING_REG, |v| v & !0x80)?;

        if timed_out {
            return Err(RfidError::Timeout);
        }

        let err = self.read_reg(Self::ERROR_REG)?;
        if err & Self::ERR_COLLISION != 0 {
            return Err(RfidError::Collision);
        }
        if err & Self::ERR_FATAL != 0 {
            return Err(RfidError::Protocol(err & Self::ERR_FATAL));
        }

        let level = (self.read_reg(Self::FIFO_LEVEL_REG)? as usize).min(Self::MAX_FIFO_BYTES);
        let mut data = Vec::with_capacity(level);
        for _ in 0..level {
            data.push(self.read_reg(Self::FIFO_DATA_REG)?);
        }

        debug!("transceive {:02X?} -> {:02X?}", send, data);
        Ok(data)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), RfidError> {
        // Section 8.1.2.2: address byte is (reg << 1), MSB clear for writes
        self.bus
            .write(&[(reg << 1) & 0x7E, value])
            .map_err(|e| RfidError::Transport(format!("{:?}", e)))
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, RfidError> {
        // Section 8.1.2.1: MSB set for reads, value arrives in the second byte
        let tx = [((reg << 1) & 0x7E) | 0x80, 0];
        let mut rx = [0u8; 2];
        self.bus
            .transfer(&mut rx, &tx)
            .map_err(|e| RfidError::Transport(format!("{:?}", e)))?;
        Ok(rx[1])
    }

    fn read_write(&mut self, reg: u8, f: impl FnOnce(u8) -> u8) -> Result<(), RfidError> {
        let value = self.read_reg(reg)?;
        self.write_reg(reg, f(value))
    }
}

/// ISO/IEC 14443-3 CRC_A (poly 0x1021 reflected, init 0x6363), LSB first.
///
/// The chip's CalcCRC coprocessor produces the same bytes; computing it on
/// the host keeps the whole protocol path runnable against a mock bus.
pub(crate) fn crc_a(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        let mut ch = byte ^ (crc as u8);
        ch ^= ch << 4;
        crc = (crc >> 8) ^ ((ch as u16) << 8) ^ ((ch as u16) << 3) ^ ((ch as u16) >> 4);
    }
    [crc as u8, (crc >> 8) as u8]
}
