//! SPI command transport for the LR11xx family
//!
//! Every LR11xx command is a 16-bit opcode followed by parameters, written in
//! one SPI transaction. Commands that return data are followed by a second
//! transaction, once BUSY is low again, in which the chip clocks out its
//! `stat1` register and then the response bytes.
//!
//! ```text
//! write:  NSS↓ [op_hi op_lo params..]            NSS↑   (BUSY↑ while processing)
//! read:   NSS↓ [stat1] [resp0 resp1 ..]          NSS↑
//! ```
//!
//! The feature modules (`gnss`, `system`) are extension traits implemented
//! on [`Lr11xx`] in terms of the three `execute_*` primitives below.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::iv::InterfaceVariant;

// =============================================================================
// Errors and status
// =============================================================================

/// Errors raised by the transport layer
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RadioError {
    /// SPI bus transaction failed
    Spi,
    /// Driving the NRESET line failed
    Reset,
    /// Waiting for BUSY to drop failed
    Busy,
    /// Buffer length does not match what the command requires (expected, actual)
    PayloadSizeMismatch(usize, usize),
    /// The chip rejected the command (`stat1` reported FAIL or PERR)
    CommandFailed(CommandStatus),
}

/// Command status reported in bits 3-1 of `stat1`
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CommandStatus {
    /// Command failed
    Fail = 0x00,
    /// Permission error
    Perr = 0x01,
    /// Command OK
    Ok = 0x02,
    /// Data available
    Data = 0x03,
}

impl From<u8> for CommandStatus {
    fn from(value: u8) -> Self {
        match value & 0x07 {
            0x00 => CommandStatus::Fail,
            0x01 => CommandStatus::Perr,
            0x02 => CommandStatus::Ok,
            0x03 => CommandStatus::Data,
            _ => CommandStatus::Fail,
        }
    }
}

impl CommandStatus {
    /// Whether the chip accepted the previous command
    pub fn is_ok(self) -> bool {
        matches!(self, CommandStatus::Ok | CommandStatus::Data)
    }
}

/// Status register 1, returned as the first byte of every read phase
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Stat1 {
    /// Raw command status field
    pub command_status: u8,
    /// Interrupt is active
    pub is_interrupt_active: bool,
}

impl Stat1 {
    /// Parse from raw byte
    pub fn from_byte(byte: u8) -> Self {
        Self {
            is_interrupt_active: (byte & 0x01) != 0,
            command_status: byte >> 1,
        }
    }

    /// Get command status as enum
    pub fn status(&self) -> CommandStatus {
        CommandStatus::from(self.command_status)
    }
}

// =============================================================================
// Driver
// =============================================================================

/// An LR11xx transceiver on an SPI bus
///
/// `SPI` owns chip select; `IV` handles the RESET and BUSY lines.
pub struct Lr11xx<SPI, IV> {
    spi: SPI,
    iv: IV,
}

impl<SPI, IV> Lr11xx<SPI, IV>
where
    SPI: SpiDevice<u8>,
    IV: InterfaceVariant,
{
    /// Wrap an SPI device and interface variant
    pub fn new(spi: SPI, iv: IV) -> Self {
        Self { spi, iv }
    }

    /// Give back the SPI device and interface variant
    pub fn release(self) -> (SPI, IV) {
        (self.spi, self.iv)
    }

    /// Hardware reset through NRESET, returning once the chip is ready
    pub async fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), RadioError> {
        self.iv.reset(delay).await?;
        self.iv.wait_on_busy().await
    }

    /// Block until the chip lowers BUSY
    pub async fn wait_on_busy(&mut self) -> Result<(), RadioError> {
        self.iv.wait_on_busy().await
    }

    /// Send a command that carries no response
    pub async fn execute_command(&mut self, cmd: &[u8]) -> Result<(), RadioError> {
        self.iv.wait_on_busy().await?;
        self.spi.write(cmd).await.map_err(|_| RadioError::Spi)
    }

    /// Send a command followed by a data payload in the same transaction
    pub async fn execute_command_with_payload(
        &mut self,
        cmd: &[u8],
        payload: &[u8],
    ) -> Result<(), RadioError> {
        self.iv.wait_on_busy().await?;
        self.spi
            .transaction(&mut [Operation::Write(cmd), Operation::Write(payload)])
            .await
            .map_err(|_| RadioError::Spi)
    }

    /// Send a command and read back `response.len()` bytes
    ///
    /// Fails with [`RadioError::CommandFailed`] when `stat1` of the read phase
    /// reports that the command was rejected.
    pub async fn execute_command_with_response(
        &mut self,
        cmd: &[u8],
        response: &mut [u8],
    ) -> Result<(), RadioError> {
        self.execute_command(cmd).await?;
        self.iv.wait_on_busy().await?;

        let mut stat1 = [0u8; 1];
        self.spi
            .transaction(&mut [Operation::Read(&mut stat1), Operation::Read(response)])
            .await
            .map_err(|_| RadioError::Spi)?;

        let status = Stat1::from_byte(stat1[0]).status();
        if !status.is_ok() {
            warn!("LR11xx rejected command: {:?}", status);
            return Err(RadioError::CommandFailed(status));
        }
        Ok(())
    }
}
