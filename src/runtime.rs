//! Modem engine driver loop
//!
//! A [`ModemEngine`] does its pending work in [`ModemEngine::tick`] and says
//! how long it may sleep before it must be ticked again. The caller owns the
//! loop and the sleep, so the same engine runs under embassy, an RTOS timer, or
//! a host test.
//!
//! ```ignore
//! let mut engine = IdleEngine::new(Duration::from_secs(60));
//! runtime::run_forever(&mut engine, &handlers, &mut embassy_time::Delay).await
//! ```

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::events::{EventHandlers, ModemEvent};

/// Something that must be serviced periodically
#[allow(async_fn_in_trait)]
pub trait ModemEngine {
    /// Run pending work, reporting events to `handlers`
    ///
    /// Returns the longest delay before the next call.
    async fn tick(&mut self, handlers: &EventHandlers) -> Duration;
}

/// Engine with no stack behind it
///
/// Reports a single reset event on its first tick, then sleeps for `period`
/// every time.
pub struct IdleEngine {
    period: Duration,
    reset_count: u16,
    started: bool,
}

impl IdleEngine {
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            reset_count: 1,
            started: false,
        }
    }
}

impl ModemEngine for IdleEngine {
    async fn tick(&mut self, handlers: &EventHandlers) -> Duration {
        if !self.started {
            self.started = true;
            handlers.dispatch(&ModemEvent::Reset {
                reset_count: self.reset_count,
            });
        }
        self.period
    }
}

/// Sleep time in milliseconds, saturating at `u32::MAX`
fn sleep_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// Tick `engine` `ticks` times, sleeping as requested after each tick
pub async fn run_ticks<E, D>(engine: &mut E, handlers: &EventHandlers, delay: &mut D, ticks: usize)
where
    E: ModemEngine,
    D: DelayNs,
{
    for _ in 0..ticks {
        let next = engine.tick(handlers).await;
        delay.delay_ms(sleep_ms(next)).await;
    }
}

/// Tick `engine` for ever
pub async fn run_forever<E, D>(engine: &mut E, handlers: &EventHandlers, delay: &mut D) -> !
where
    E: ModemEngine,
    D: DelayNs,
{
    loop {
        let next = engine.tick(handlers).await;
        trace!("Engine sleeping {} ms", sleep_ms(next));
        delay.delay_ms(sleep_ms(next)).await;
    }
}
