//! System identification for the LR11xx
//!
//! Only the version query is needed here: the almanac update flow prints the
//! chip type and firmware version at start-up.
//!
//! # Example
//!
//! ```ignore
//! use lr11xx_almanac::system::SystemExt;
//!
//! let version = radio.get_version().await?;
//! info!("Chip: {:?} HW=0x{:02X}, FW=0x{:04X}", version.chip_type, version.hw, version.fw);
//! ```

use embedded_hal_async::spi::SpiDevice;

use crate::iv::InterfaceVariant;
use crate::lr11xx::{Lr11xx, RadioError};

/// System OpCodes (16-bit commands)
#[derive(Clone, Copy)]
enum SystemOpCode {
    GetVersion = 0x0101,
}

impl SystemOpCode {
    fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

/// Length of the GetVersion response
pub const SYSTEM_VERSION_LENGTH: usize = 4;

/// LR11xx chip type
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ChipType {
    /// LR1110
    LR1110 = 0x01,
    /// LR1120
    LR1120 = 0x02,
    /// LR1121
    LR1121 = 0x03,
    /// Bootloader mode
    Bootloader = 0xDF,
    /// Unknown chip type
    Unknown = 0xFF,
}

impl From<u8> for ChipType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => ChipType::LR1110,
            0x02 => ChipType::LR1120,
            0x03 => ChipType::LR1121,
            0xDF => ChipType::Bootloader,
            _ => ChipType::Unknown,
        }
    }
}

/// Version information
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Version {
    /// Hardware version
    pub hw: u8,
    /// Chip type
    pub chip_type: ChipType,
    /// Firmware version
    pub fw: u16,
}

/// Extension trait that adds system queries to the LR11xx.
#[allow(async_fn_in_trait)]
pub trait SystemExt {
    /// Read hardware version, chip type and firmware version
    async fn get_version(&mut self) -> Result<Version, RadioError>;
}

impl<SPI, IV> SystemExt for Lr11xx<SPI, IV>
where
    SPI: SpiDevice<u8>,
    IV: InterfaceVariant,
{
    async fn get_version(&mut self) -> Result<Version, RadioError> {
        let opcode = SystemOpCode::GetVersion.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; SYSTEM_VERSION_LENGTH];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;

        Ok(Version {
            hw: rbuffer[0],
            chip_type: ChipType::from(rbuffer[1]),
            fw: ((rbuffer[2] as u16) << 8) | (rbuffer[3] as u16),
        })
    }
}
