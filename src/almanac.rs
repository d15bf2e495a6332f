//! Full almanac synchronization
//!
//! Brings the almanac stored in an LR11xx into agreement with a full almanac
//! image held by the host:
//!
//! 1. Read the device's global almanac CRC from its GNSS context status.
//! 2. If it differs from the CRC in the image header, stream the image to the
//!    device one record at a time.
//! 3. Read the CRC again and confirm it now matches.
//!
//! There are no retries. A failed run leaves the device in whatever state the
//! last accepted record produced; running again from scratch is always safe,
//! and a run against an already synchronized device performs no writes.
//!
//! # Example
//!
//! ```ignore
//! use lr11xx_almanac::almanac::{AlmanacUpdater, SyncOutcome};
//! use lr11xx_almanac::image;
//!
//! let image = image::bundled()?;
//! let mut updater = AlmanacUpdater::new();
//!
//! match updater.synchronize(&mut radio, &image).await {
//!     Ok(SyncOutcome::AlreadySynchronized) => info!("Nothing to do"),
//!     Ok(SyncOutcome::Updated { records_written }) => info!("{} records", records_written),
//!     Err(e) => error!("Almanac update failed: {:?}", e),
//! }
//! ```
//!
//! # Record origin
//!
//! Records are taken from offset 7, right after the header, by default. Real
//! LR11xx full almanac images are laid out so that the header is itself the
//! first 20-byte record and the chip expects the whole file; select
//! [`RecordOrigin::ImageStart`] for those.

use embedded_hal_async::spi::SpiDevice;

use crate::gnss::{
    ContextStatusParseError, GnssContextStatus, GnssContextStatusBytestream, GnssExt,
    GNSS_SINGLE_ALMANAC_WRITE_SIZE,
};
use crate::image::{AlmanacImage, ALMANAC_HEADER_SIZE};
use crate::iv::InterfaceVariant;
use crate::lr11xx::{Lr11xx, RadioError};

// =============================================================================
// Device boundary
// =============================================================================

/// What the synchronizer needs from a device holding an almanac
#[allow(async_fn_in_trait)]
pub trait AlmanacDevice {
    /// Size of one almanac write
    const RECORD_SIZE: usize;

    /// Query the raw GNSS context status
    async fn read_context_status(&mut self) -> Result<GnssContextStatusBytestream, RadioError>;

    /// Store one record of exactly [`Self::RECORD_SIZE`] bytes
    async fn write_record(&mut self, record: &[u8]) -> Result<(), RadioError>;
}

impl<SPI, IV> AlmanacDevice for Lr11xx<SPI, IV>
where
    SPI: SpiDevice<u8>,
    IV: InterfaceVariant,
{
    const RECORD_SIZE: usize = GNSS_SINGLE_ALMANAC_WRITE_SIZE;

    async fn read_context_status(&mut self) -> Result<GnssContextStatusBytestream, RadioError> {
        self.gnss_get_context_status_bytestream().await
    }

    async fn write_record(&mut self, record: &[u8]) -> Result<(), RadioError> {
        self.gnss_almanac_update(record, 1).await
    }
}

// =============================================================================
// Configuration and results
// =============================================================================

/// Where the first record starts within the image
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RecordOrigin {
    /// Records follow the 7-byte header
    #[default]
    AfterHeader,
    /// The whole image, header included, is sent as records
    ImageStart,
}

impl RecordOrigin {
    /// Byte offset of the first record
    pub fn offset(self) -> usize {
        match self {
            RecordOrigin::AfterHeader => ALMANAC_HEADER_SIZE,
            RecordOrigin::ImageStart => 0,
        }
    }
}

/// Synchronizer settings
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SyncConfig {
    pub origin: RecordOrigin,
}

/// Successful synchronization
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SyncOutcome {
    /// The device already held this almanac; nothing was written
    AlreadySynchronized,
    /// The image was written and verified
    Updated { records_written: usize },
}

/// Failure to obtain the device CRC
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CrcReadError {
    /// The context status command failed
    StatusQueryFailed(RadioError),
    /// The context status could not be decoded
    StatusParseFailed(ContextStatusParseError),
}

/// Failure of a synchronization run
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum SyncError {
    /// The record region is not a whole number of records
    MalformedImage { payload_len: usize, record_size: usize },
    /// Reading the CRC before writing failed
    PreCheckFailed(CrcReadError),
    /// The device refused the record at `offset`
    WriteFailed { offset: usize, error: RadioError },
    /// Reading the CRC after writing failed
    PostCheckFailed(CrcReadError),
    /// All records were accepted but the device CRC still differs
    VerificationFailed { expected: u32, actual: u32 },
}

// =============================================================================
// Updater
// =============================================================================

/// Full almanac updater
///
/// Holds no device state between runs beyond the last CRC it observed, which
/// is kept for diagnostics only.
#[derive(Debug, Default)]
pub struct AlmanacUpdater {
    config: SyncConfig,
    last_crc: Option<u32>,
    update_attempts: u32,
}

impl AlmanacUpdater {
    /// Updater with the default configuration
    pub const fn new() -> Self {
        Self::with_config(SyncConfig {
            origin: RecordOrigin::AfterHeader,
        })
    }

    pub const fn with_config(config: SyncConfig) -> Self {
        Self {
            config,
            last_crc: None,
            update_attempts: 0,
        }
    }

    pub fn config(&self) -> SyncConfig {
        self.config
    }

    /// CRC read from the device by the most recent successful query
    pub fn last_crc(&self) -> Option<u32> {
        self.last_crc
    }

    /// Number of runs that started writing records
    pub fn update_attempts(&self) -> u32 {
        self.update_attempts
    }

    /// Read the device's global almanac CRC
    pub async fn get_device_crc<D: AlmanacDevice>(
        &mut self,
        device: &mut D,
    ) -> Result<u32, CrcReadError> {
        let raw = device
            .read_context_status()
            .await
            .map_err(CrcReadError::StatusQueryFailed)?;
        let status = GnssContextStatus::parse(&raw).map_err(CrcReadError::StatusParseFailed)?;

        self.last_crc = Some(status.global_almanac_crc);
        Ok(status.global_almanac_crc)
    }

    /// Bring the device almanac in line with `image`
    ///
    /// The image is checked before the device is touched. Records are written
    /// in increasing offset order and the first refused record ends the run.
    pub async fn synchronize<D: AlmanacDevice>(
        &mut self,
        device: &mut D,
        image: &AlmanacImage<'_>,
    ) -> Result<SyncOutcome, SyncError> {
        let origin = self.config.origin.offset();
        let records = &image.as_bytes()[origin..];
        let record_size = D::RECORD_SIZE;
        if record_size == 0 || records.len() % record_size != 0 {
            error!(
                "Almanac image of {} bytes is not made of {}-byte records",
                records.len(),
                record_size
            );
            return Err(SyncError::MalformedImage {
                payload_len: records.len(),
                record_size,
            });
        }

        let local_crc = image.crc();
        let device_crc = self.get_device_crc(device).await.map_err(|e| {
            error!("Failed to get almanac CRC before update: {:?}", e);
            SyncError::PreCheckFailed(e)
        })?;
        debug!(
            "Almanac CRC local 0x{:08X}, LR11XX 0x{:08X}",
            local_crc,
            device_crc
        );

        if device_crc == local_crc {
            info!("Local almanac matches LR11XX almanac -> no update");
            return Ok(SyncOutcome::AlreadySynchronized);
        }

        info!("Local almanac doesn't match LR11XX almanac -> start update");
        self.update_attempts = self.update_attempts.saturating_add(1);

        let mut records_written = 0;
        for (index, record) in records.chunks_exact(record_size).enumerate() {
            let offset = origin + index * record_size;
            if let Err(e) = device.write_record(record).await {
                error!("Failed to update almanac at offset {}: {:?}", offset, e);
                return Err(SyncError::WriteFailed { offset, error: e });
            }
            records_written += 1;
        }
        trace!("{} almanac records written", records_written);

        let device_crc = self.get_device_crc(device).await.map_err(|e| {
            error!("Failed to get almanac CRC after update: {:?}", e);
            SyncError::PostCheckFailed(e)
        })?;

        if device_crc != local_crc {
            error!(
                "Local almanac doesn't match LR11XX almanac -> update failed (0x{:08X} != 0x{:08X})",
                local_crc,
                device_crc
            );
            return Err(SyncError::VerificationFailed {
                expected: local_crc,
                actual: device_crc,
            });
        }

        info!("Almanac update succeeded");
        Ok(SyncOutcome::Updated { records_written })
    }
}
