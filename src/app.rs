//! Full almanac update application
//!
//! Start-up sequence of a device that keeps its LR11xx almanac in line with
//! the image bundled in its firmware:
//!
//! ```text
//! banner -> chip / GNSS versions -> source almanac date -> synchronize -> engine loop
//! ```
//!
//! A failed update is logged and the device carries on; the next boot tries
//! again.
//!
//! ```ignore
//! let image = image::bundled()?;
//! let mut app = AlmanacUpdateApp::new();
//! let mut engine = IdleEngine::new(Duration::from_secs(60));
//! app.run(&mut radio, &image, &mut engine, &mut embassy_time::Delay).await
//! ```

use embedded_hal_async::delay::DelayNs;

use crate::almanac::{AlmanacDevice, AlmanacUpdater, SyncError, SyncOutcome};
use crate::events::EventHandlers;
use crate::gnss::GnssExt;
use crate::image::AlmanacImage;
use crate::runtime::{self, ModemEngine};
use crate::system::SystemExt;

fn on_modem_reset(reset_count: u16) {
    info!("Modem reset (count {})", reset_count);
}

/// Full almanac update application
pub struct AlmanacUpdateApp {
    updater: AlmanacUpdater,
    handlers: EventHandlers,
}

impl Default for AlmanacUpdateApp {
    fn default() -> Self {
        Self::new()
    }
}

impl AlmanacUpdateApp {
    /// Default updater, with only the reset event handled
    pub const fn new() -> Self {
        let mut handlers = EventHandlers::new();
        handlers.reset = Some(on_modem_reset);
        Self::with_parts(AlmanacUpdater::new(), handlers)
    }

    pub const fn with_parts(updater: AlmanacUpdater, handlers: EventHandlers) -> Self {
        Self { updater, handlers }
    }

    pub fn updater(&self) -> &AlmanacUpdater {
        &self.updater
    }

    pub fn handlers(&self) -> &EventHandlers {
        &self.handlers
    }

    /// Log chip and GNSS firmware versions, warning on failure
    pub async fn display_versions<R>(&self, radio: &mut R)
    where
        R: SystemExt + GnssExt,
    {
        match radio.get_version().await {
            Ok(version) => info!(
                "LR11xx {:?}: HW 0x{:02X}, FW 0x{:04X}",
                version.chip_type,
                version.hw,
                version.fw
            ),
            Err(e) => warn!("Failed to read LR11xx version: {:?}", e),
        }

        match radio.gnss_read_firmware_version().await {
            Ok(version) => info!(
                "GNSS firmware 0x{:02X}, almanac format 0x{:02X}",
                version.gnss_firmware,
                version.gnss_almanac
            ),
            Err(e) => warn!("Failed to read GNSS firmware version: {:?}", e),
        }
    }

    /// Announce, then bring the device almanac in line with `image`
    pub async fn start<R>(
        &mut self,
        radio: &mut R,
        image: &AlmanacImage<'_>,
    ) -> Result<SyncOutcome, SyncError>
    where
        R: SystemExt + GnssExt + AlmanacDevice,
    {
        info!("===== LR11xx full almanac update =====");
        self.display_versions(radio).await;

        let date = image.date();
        info!("Source almanac date: {}", date.format().as_str());

        let result = self.updater.synchronize(radio, image).await;
        if let Err(e) = result {
            error!("Almanac update failed: {:?}", e);
        }
        result
    }

    /// [`start`](Self::start), then tick `engine` for ever
    pub async fn run<R, E, D>(
        &mut self,
        radio: &mut R,
        image: &AlmanacImage<'_>,
        engine: &mut E,
        delay: &mut D,
    ) -> !
    where
        R: SystemExt + GnssExt + AlmanacDevice,
        E: ModemEngine,
        D: DelayNs,
    {
        let _ = self.start(radio, image).await;
        runtime::run_forever(engine, &self.handlers, delay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lr11xx::{Lr11xx, RadioError};
    use crate::runtime::IdleEngine;
    use crate::test_support::{block_on, context_status_bytestream, FakeIv, FakeSpi, NoopDelay};
    use embassy_time::Duration;

    const CRC: u32 = 0x600D_A1A1;

    fn image_bytes() -> Vec<u8> {
        let mut bytes = vec![0x80, 0x08, 0x07];
        bytes.extend_from_slice(&CRC.to_le_bytes());
        bytes.extend_from_slice(&[0x5A; 20]);
        bytes
    }

    fn queue_versions(spi: &mut FakeSpi) {
        spi.queue_response(&[0x06, 0x22, 0x01, 0x04, 0x01]);
        spi.queue_response(&[0x06, 0x01, 0x07]);
    }

    #[test]
    fn test_start_updates_then_verifies() {
        let mut spi = FakeSpi::new();
        queue_versions(&mut spi);
        spi.queue_response(&[0x06]);
        spi.queue_response(&context_status_bytestream(0));
        spi.queue_response(&[0x06]);
        spi.queue_response(&context_status_bytestream(CRC));
        let mut radio = Lr11xx::new(spi, FakeIv::new());

        let bytes = image_bytes();
        let image = AlmanacImage::new(&bytes).unwrap();
        let mut app = AlmanacUpdateApp::new();

        let outcome = block_on(app.start(&mut radio, &image));
        assert_eq!(outcome, Ok(SyncOutcome::Updated { records_written: 1 }));
        assert_eq!(app.updater().update_attempts(), 1);

        let (spi, _) = radio.release();
        // versions (4), query (2), write (1), query (2)
        assert_eq!(spi.frames.len(), 9);
        assert_eq!(spi.frames[0], [0x01, 0x01]);
        assert_eq!(spi.frames[2], [0x04, 0x06]);
        assert_eq!(spi.frames[6][..2], [0x04, 0x0E]);
    }

    #[test]
    fn test_version_failures_do_not_block_update() {
        let mut spi = FakeSpi::new();
        // both version reads rejected with FAIL
        spi.queue_response(&[0x00, 0, 0, 0, 0]);
        spi.queue_response(&[0x00, 0, 0]);
        spi.queue_response(&[0x06]);
        spi.queue_response(&context_status_bytestream(CRC));
        let mut radio = Lr11xx::new(spi, FakeIv::new());

        let bytes = image_bytes();
        let image = AlmanacImage::new(&bytes).unwrap();
        let outcome = block_on(AlmanacUpdateApp::new().start(&mut radio, &image));
        assert_eq!(outcome, Ok(SyncOutcome::AlreadySynchronized));
    }

    #[test]
    fn test_failed_update_is_returned() {
        let mut spi = FakeSpi::new();
        queue_versions(&mut spi);
        spi.queue_response(&[0x02]); // PERR on the context status
        let mut radio = Lr11xx::new(spi, FakeIv::new());

        let bytes = image_bytes();
        let image = AlmanacImage::new(&bytes).unwrap();
        let outcome = block_on(AlmanacUpdateApp::new().start(&mut radio, &image));
        assert!(matches!(
            outcome,
            Err(SyncError::PreCheckFailed(crate::almanac::CrcReadError::StatusQueryFailed(
                RadioError::CommandFailed(_)
            )))
        ));
    }

    #[test]
    fn test_default_handlers() {
        let app = AlmanacUpdateApp::default();
        assert!(app.handlers().reset.is_some());
        assert!(app.handlers().joined.is_none());

        let mut engine = IdleEngine::new(Duration::from_millis(500));
        let mut delay = NoopDelay::default();
        block_on(runtime::run_ticks(&mut engine, app.handlers(), &mut delay, 2));
        assert_eq!(delay.total_ms, 1_000);
    }
}
