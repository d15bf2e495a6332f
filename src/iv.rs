//! Interface variant for boards with the LR11xx BUSY pin connected
//!
//! The LR11xx raises BUSY while it processes a command and ignores SPI
//! traffic until it drops again, so every transaction must first wait for
//! BUSY low. Use [`Lr11xxInterfaceVariant`] on any platform (STM32, nRF52,
//! RP2040, ...) where RESET and BUSY are wired to GPIOs.
//!
//! ```ignore
//! let iv = Lr11xxInterfaceVariant::new(reset, busy);
//! let mut radio = Lr11xx::new(spi_device, iv);
//! radio.reset(&mut embassy_time::Delay).await?;
//! ```

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;

use crate::lr11xx::RadioError;

/// NRESET low pulse width (datasheet minimum is 100 us)
const RESET_PULSE_MS: u32 = 1;

/// Board-level control lines of an LR11xx
#[allow(async_fn_in_trait)]
pub trait InterfaceVariant {
    /// Pulse NRESET
    async fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), RadioError>;

    /// Wait until the chip is ready to accept a command
    async fn wait_on_busy(&mut self) -> Result<(), RadioError>;
}

/// [`InterfaceVariant`] over a RESET output and a BUSY input
pub struct Lr11xxInterfaceVariant<RESET, BUSY> {
    reset: RESET,
    busy: BUSY,
}

impl<RESET, BUSY> Lr11xxInterfaceVariant<RESET, BUSY>
where
    RESET: OutputPin,
    BUSY: Wait,
{
    /// Create an interface variant from the RESET and BUSY pins
    pub fn new(reset: RESET, busy: BUSY) -> Self {
        Self { reset, busy }
    }
}

impl<RESET, BUSY> InterfaceVariant for Lr11xxInterfaceVariant<RESET, BUSY>
where
    RESET: OutputPin,
    BUSY: Wait,
{
    async fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), RadioError> {
        self.reset.set_low().map_err(|_| RadioError::Reset)?;
        delay.delay_ms(RESET_PULSE_MS).await;
        self.reset.set_high().map_err(|_| RadioError::Reset)
    }

    async fn wait_on_busy(&mut self) -> Result<(), RadioError> {
        self.busy.wait_for_low().await.map_err(|_| RadioError::Busy)
    }
}
