//! Full almanac image
//!
//! A full almanac image is produced offline from a current almanac download
//! and pushed to the LR11xx in fixed-size records. Its header carries the
//! almanac date and the CRC the chip will report once every record is
//! stored:
//!
//! ```text
//! offset  0      1..=2          3..=6            7..
//!         [rsvd] [date, LE u16] [CRC, LE u32]    [records ...]
//! ```
//!
//! The date counts days since the second GPS week rollover
//! (2019-04-07, GPS week 2048).
//!
//! An image can be embedded at build time by pointing the
//! `LR11XX_ALMANAC_IMAGE` environment variable at the file; see [`bundled`].

use core::fmt::Write;

use chrono::{DateTime, Datelike, Utc, Weekday};

/// Size of the image header (reserved byte, date, CRC)
pub const ALMANAC_HEADER_SIZE: usize = 7;

/// Seconds between the Unix epoch and the GPS epoch (1980-01-06)
pub const GPS_EPOCH_UNIX_OFFSET_S: u64 = 315_964_800;

/// Days between the GPS epoch and the almanac date origin (week 2048)
pub const ALMANAC_DATE_ORIGIN_DAYS: u64 = 2048 * 7;

const SECONDS_PER_DAY: u64 = 24 * 3600;

include!(concat!(env!("OUT_DIR"), "/bundled_almanac.rs"));

/// Errors raised when wrapping an image
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ImageError {
    /// Fewer bytes than the header
    TooShort { len: usize },
}

/// Borrowed, read-only almanac image
#[derive(Clone, Copy, Debug)]
pub struct AlmanacImage<'a> {
    bytes: &'a [u8],
}

impl<'a> AlmanacImage<'a> {
    /// Wrap an image, checking that it holds at least a header
    pub fn new(bytes: &'a [u8]) -> Result<Self, ImageError> {
        if bytes.len() < ALMANAC_HEADER_SIZE {
            return Err(ImageError::TooShort { len: bytes.len() });
        }
        Ok(Self { bytes })
    }

    /// The whole image, header included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Raw almanac date (days since GPS week 2048)
    pub fn date_raw(&self) -> u16 {
        u16::from_le_bytes([self.bytes[1], self.bytes[2]])
    }

    /// Almanac date
    pub fn date(&self) -> AlmanacDate {
        AlmanacDate::from_raw(self.date_raw())
    }

    /// CRC the chip reports once this image is stored
    pub fn crc(&self) -> u32 {
        u32::from_le_bytes([self.bytes[3], self.bytes[4], self.bytes[5], self.bytes[6]])
    }

    /// Everything after the header
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[ALMANAC_HEADER_SIZE..]
    }
}

/// Image embedded at build time from `LR11XX_ALMANAC_IMAGE`
///
/// Returns [`ImageError::TooShort`] when no image was configured.
pub fn bundled() -> Result<AlmanacImage<'static>, ImageError> {
    AlmanacImage::new(BUNDLED_ALMANAC)
}

// =============================================================================
// Almanac date
// =============================================================================

/// Almanac date decoded from the image header
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct AlmanacDate {
    raw: u16,
    datetime: DateTime<Utc>,
}

impl AlmanacDate {
    /// Decode a raw header date
    pub fn from_raw(raw: u16) -> Self {
        // u16::MAX days past the origin lands in 2198, well inside chrono's range
        let datetime =
            DateTime::<Utc>::from_timestamp(unix_seconds_from_raw(raw) as i64, 0).unwrap_or_default();
        Self { raw, datetime }
    }

    /// Raw header value
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// Seconds since the Unix epoch at midnight UTC of this date
    pub fn unix_seconds(&self) -> u64 {
        unix_seconds_from_raw(self.raw)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.datetime
    }

    pub fn year(&self) -> i32 {
        self.datetime.year()
    }

    pub fn month(&self) -> u32 {
        self.datetime.month()
    }

    pub fn day(&self) -> u32 {
        self.datetime.day()
    }

    pub fn weekday(&self) -> Weekday {
        self.datetime.weekday()
    }

    /// Render as `Sun 2019-04-07 00:00:00 UTC`
    pub fn format(&self) -> heapless::String<32> {
        let mut out = heapless::String::new();
        // 27 characters for any four-digit year, always fits
        let _ = write!(out, "{} {}", self.datetime.weekday(), self.datetime);
        out
    }
}

fn unix_seconds_from_raw(raw: u16) -> u64 {
    GPS_EPOCH_UNIX_OFFSET_S + SECONDS_PER_DAY * (ALMANAC_DATE_ORIGIN_DAYS + raw as u64)
}
