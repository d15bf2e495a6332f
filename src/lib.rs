//! Full GNSS almanac update for Semtech LR11xx transceivers
//!
//! Keeps the almanac stored in an LR1110 / LR1120 / LR1121 in line with a
//! full almanac image bundled in the host firmware. The device CRC is read
//! from the GNSS context status and compared with the CRC in the image
//! header; only when they differ is the image written, record by record, and
//! the result verified.
//!
//! # Modules
//!
//! - **lr11xx**: SPI command transport and transport errors
//! - **iv**: RESET and BUSY line handling
//! - **system / gnss**: the chip commands used by the update
//! - **image**: image header and almanac date
//! - **almanac**: the synchronizer
//! - **events / runtime / app**: start-up application and engine loop
//!
//! # Usage
//!
//! ```ignore
//! use lr11xx_almanac::{AlmanacImage, AlmanacUpdater, Lr11xx, Lr11xxInterfaceVariant};
//!
//! let iv = Lr11xxInterfaceVariant::new(reset, busy);
//! let mut radio = Lr11xx::new(spi_device, iv);
//! radio.reset(&mut embassy_time::Delay).await?;
//!
//! let image = AlmanacImage::new(FULL_ALMANAC)?;
//! let outcome = AlmanacUpdater::new().synchronize(&mut radio, &image).await?;
//! ```
//!
//! # Logging
//!
//! Enable `defmt-03` for defmt output or `log` for the `log` facade. With
//! neither, log statements compile away.

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

// Must come first so the macros are visible to every module
#[macro_use]
mod fmt;

pub mod almanac;
pub mod app;
pub mod events;
pub mod gnss;
pub mod image;
pub mod iv;
pub mod lr11xx;
pub mod runtime;
pub mod system;

#[cfg(test)]
mod test_support;

pub use almanac::{AlmanacDevice, AlmanacUpdater, SyncConfig, SyncError, SyncOutcome};
pub use image::AlmanacImage;
pub use iv::{InterfaceVariant, Lr11xxInterfaceVariant};
pub use lr11xx::{Lr11xx, RadioError};
