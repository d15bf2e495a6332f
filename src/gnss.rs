//! GNSS context and almanac commands for the LR11xx
//!
//! The almanac update flow needs three GNSS commands: reading the context
//! status (which carries the global almanac CRC), writing almanac records,
//! and reading the GNSS firmware version for diagnostics.
//!
//! # Example
//!
//! ```ignore
//! use lr11xx_almanac::gnss::{GnssContextStatus, GnssExt};
//!
//! let raw = radio.gnss_get_context_status_bytestream().await?;
//! let status = GnssContextStatus::parse(&raw)?;
//! info!("Almanac CRC: 0x{:08X}", status.global_almanac_crc);
//!
//! // Push one 20-byte almanac record
//! radio.gnss_almanac_update(&record, 1).await?;
//! ```

use embedded_hal_async::spi::SpiDevice;

use crate::iv::InterfaceVariant;
use crate::lr11xx::{Lr11xx, RadioError};

// =============================================================================
// GNSS Types and Constants
// =============================================================================

/// GNSS OpCodes (16-bit commands)
#[derive(Clone, Copy, PartialEq)]
pub enum GnssOpCode {
    /// Read the GNSS firmware version (0x0406)
    ReadFwVersion = 0x0406,
    /// Update the almanac (0x040E)
    AlmanacUpdate = 0x040E,
    /// Read the context (0x0416)
    GetContextStatus = 0x0416,
}

impl GnssOpCode {
    pub fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

/// Size of the almanac of a single satellite when writing
pub const GNSS_SINGLE_ALMANAC_WRITE_SIZE: usize = 20;

/// Size of the GNSS context status buffer
pub const GNSS_CONTEXT_STATUS_LENGTH: usize = 9;

/// DMC message opcode identifying a context status report
pub const GNSS_DMC_STATUS_MESSAGE: u8 = 0x18;

/// Raw context status as returned by the chip
pub type GnssContextStatusBytestream = [u8; GNSS_CONTEXT_STATUS_LENGTH];

const ALMANAC_UPDATE_GPS_MASK: u8 = 0x02;
const ALMANAC_UPDATE_BEIDOU_MASK: u8 = 0x04;

/// GNSS response type indicates the destination
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssDestination {
    /// Host MCU
    Host = 0x00,
    /// GNSS Solver (LoRa Cloud)
    Solver = 0x01,
    /// GNSS DMC (Device Management Component)
    Dmc = 0x02,
}

impl GnssDestination {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// GNSS error codes
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssErrorCode {
    NoError,
    AlmanacTooOld,
    UpdateCrcMismatch,
    UpdateFlashMemoryIntegrity,
    AlmanacUpdateNotAllowed,
    /// Code not documented for this firmware
    Unknown(u8),
}

impl From<u8> for GnssErrorCode {
    fn from(value: u8) -> Self {
        match value {
            0 => GnssErrorCode::NoError,
            1 => GnssErrorCode::AlmanacTooOld,
            2 => GnssErrorCode::UpdateCrcMismatch,
            3 => GnssErrorCode::UpdateFlashMemoryIntegrity,
            4 => GnssErrorCode::AlmanacUpdateNotAllowed,
            other => GnssErrorCode::Unknown(other),
        }
    }
}

/// GNSS frequency search space
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssFreqSearchSpace {
    Hz250 = 0,
    Hz500 = 1,
    Khz1 = 2,
    Khz2 = 3,
}

impl From<u8> for GnssFreqSearchSpace {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => GnssFreqSearchSpace::Hz250,
            1 => GnssFreqSearchSpace::Hz500,
            2 => GnssFreqSearchSpace::Khz1,
            _ => GnssFreqSearchSpace::Khz2,
        }
    }
}

/// GNSS firmware version
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssVersion {
    /// Version of the firmware
    pub gnss_firmware: u8,
    /// Version of the almanac format
    pub gnss_almanac: u8,
}

/// Why a context status bytestream could not be decoded
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ContextStatusParseError {
    /// First byte is not the DMC destination
    UnexpectedDestination(u8),
    /// Second byte is not the DMC status message
    UnexpectedMessage(u8),
}

/// GNSS context status structure
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssContextStatus {
    /// Firmware version
    pub firmware_version: u8,
    /// Global almanac CRC
    pub global_almanac_crc: u32,
    /// Error code
    pub error_code: GnssErrorCode,
    /// Whether GPS almanac needs update
    pub almanac_update_gps: bool,
    /// Whether BeiDou almanac needs update
    pub almanac_update_beidou: bool,
    /// Frequency search space
    pub freq_search_space: GnssFreqSearchSpace,
}

impl GnssContextStatus {
    /// Decode the context status bytestream
    ///
    /// Layout (per SWDR001):
    /// - `[0]` destination, must be DMC
    /// - `[1]` message opcode, must be the DMC status message
    /// - `[2]` firmware version
    /// - `[3..=6]` global almanac CRC, little-endian
    /// - `[7]` error code (bits 7-4), BeiDou/GPS update flags (bits 2/1),
    ///   frequency search space MSB (bit 0)
    /// - `[8]` frequency search space LSB (bit 7)
    pub fn parse(
        bytestream: &GnssContextStatusBytestream,
    ) -> Result<Self, ContextStatusParseError> {
        if bytestream[0] != GnssDestination::Dmc.value() {
            return Err(ContextStatusParseError::UnexpectedDestination(bytestream[0]));
        }
        if bytestream[1] != GNSS_DMC_STATUS_MESSAGE {
            return Err(ContextStatusParseError::UnexpectedMessage(bytestream[1]));
        }

        let global_almanac_crc =
            u32::from_le_bytes([bytestream[3], bytestream[4], bytestream[5], bytestream[6]]);

        Ok(Self {
            firmware_version: bytestream[2],
            global_almanac_crc,
            error_code: GnssErrorCode::from(bytestream[7] >> 4),
            almanac_update_gps: (bytestream[7] & ALMANAC_UPDATE_GPS_MASK) != 0,
            almanac_update_beidou: (bytestream[7] & ALMANAC_UPDATE_BEIDOU_MASK) != 0,
            freq_search_space: GnssFreqSearchSpace::from(
                ((bytestream[7] & 0x01) << 1) | ((bytestream[8] & 0x80) >> 7),
            ),
        })
    }
}

// =============================================================================
// GNSS Extension Trait
// =============================================================================

/// Extension trait that adds GNSS almanac functionality to the LR11xx radio.
#[allow(async_fn_in_trait)]
pub trait GnssExt {
    /// Read the GNSS firmware version
    async fn gnss_read_firmware_version(&mut self) -> Result<GnssVersion, RadioError>;

    /// Read the raw GNSS context status
    ///
    /// Decode it with [`GnssContextStatus::parse`].
    async fn gnss_get_context_status_bytestream(
        &mut self,
    ) -> Result<GnssContextStatusBytestream, RadioError>;

    /// Write `nb_almanac` almanac records of [`GNSS_SINGLE_ALMANAC_WRITE_SIZE`] bytes
    ///
    /// `blocks` must hold exactly `nb_almanac` records.
    async fn gnss_almanac_update(&mut self, blocks: &[u8], nb_almanac: u8)
        -> Result<(), RadioError>;
}

impl<SPI, IV> GnssExt for Lr11xx<SPI, IV>
where
    SPI: SpiDevice<u8>,
    IV: InterfaceVariant,
{
    async fn gnss_read_firmware_version(&mut self) -> Result<GnssVersion, RadioError> {
        let opcode = GnssOpCode::ReadFwVersion.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 2];
        self.execute_command_with_response(&cmd, &mut rbuffer)
            .await?;

        Ok(GnssVersion {
            gnss_firmware: rbuffer[0],
            gnss_almanac: rbuffer[1],
        })
    }

    async fn gnss_get_context_status_bytestream(
        &mut self,
    ) -> Result<GnssContextStatusBytestream, RadioError> {
        let opcode = GnssOpCode::GetContextStatus.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; GNSS_CONTEXT_STATUS_LENGTH];
        self.execute_command_with_response(&cmd, &mut rbuffer)
            .await?;
        Ok(rbuffer)
    }

    async fn gnss_almanac_update(
        &mut self,
        blocks: &[u8],
        nb_almanac: u8,
    ) -> Result<(), RadioError> {
        let expected_size = (nb_almanac as usize) * GNSS_SINGLE_ALMANAC_WRITE_SIZE;
        if blocks.len() != expected_size {
            return Err(RadioError::PayloadSizeMismatch(expected_size, blocks.len()));
        }

        let opcode = GnssOpCode::AlmanacUpdate.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command_with_payload(&cmd, blocks).await
    }
}
