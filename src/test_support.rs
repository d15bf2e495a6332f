//! Fakes shared by the unit tests

use std::collections::VecDeque;
use std::convert::Infallible;

pub use embassy_futures::block_on;

use embedded_hal::digital::{ErrorKind as PinErrorKind, ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorKind as SpiErrorKind, ErrorType as SpiErrorType};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::almanac::AlmanacDevice;
use crate::gnss::{GnssContextStatusBytestream, GnssDestination, GNSS_DMC_STATUS_MESSAGE};
use crate::iv::InterfaceVariant;
use crate::lr11xx::RadioError;

// =============================================================================
// Bus and pins
// =============================================================================

/// SPI device that records what it is sent and plays back queued bytes
///
/// Each transaction appends one entry to `frames` holding every written byte;
/// a read-only transaction records an empty frame. Reads are served from the
/// response queue, zero once it runs dry.
#[derive(Default)]
pub struct FakeSpi {
    pub frames: Vec<Vec<u8>>,
    pub fail: bool,
    responses: VecDeque<u8>,
}

impl FakeSpi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    fn fill(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.responses.pop_front().unwrap_or(0);
        }
    }
}

impl SpiErrorType for FakeSpi {
    type Error = SpiErrorKind;
}

impl SpiDevice<u8> for FakeSpi {
    async fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(SpiErrorKind::Other);
        }

        let mut frame = Vec::new();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => frame.extend_from_slice(data),
                Operation::Read(buf) => self.fill(buf),
                Operation::Transfer(read, write) => {
                    frame.extend_from_slice(write);
                    self.fill(read);
                }
                Operation::TransferInPlace(buf) => {
                    frame.extend_from_slice(buf);
                    self.fill(buf);
                }
                Operation::DelayNs(_) => {}
            }
        }
        self.frames.push(frame);
        Ok(())
    }
}

/// Interface variant that only counts calls
#[derive(Default)]
pub struct FakeIv {
    pub busy_waits: usize,
    pub resets: usize,
}

impl FakeIv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InterfaceVariant for FakeIv {
    async fn reset(&mut self, _delay: &mut impl DelayNs) -> Result<(), RadioError> {
        self.resets += 1;
        Ok(())
    }

    async fn wait_on_busy(&mut self) -> Result<(), RadioError> {
        self.busy_waits += 1;
        Ok(())
    }
}

/// Output pin recording every level it is driven to
#[derive(Default)]
pub struct FakeResetPin {
    pub levels: Vec<bool>,
}

impl PinErrorType for FakeResetPin {
    type Error = Infallible;
}

impl OutputPin for FakeResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

/// BUSY input that is either immediately low or broken
#[derive(Default)]
pub struct FakeBusy {
    pub waits: usize,
    pub stuck: bool,
}

impl FakeBusy {
    fn settle(&mut self) -> Result<(), PinErrorKind> {
        self.waits += 1;
        if self.stuck {
            Err(PinErrorKind::Other)
        } else {
            Ok(())
        }
    }
}

impl PinErrorType for FakeBusy {
    type Error = PinErrorKind;
}

impl Wait for FakeBusy {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.settle()
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.settle()
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.settle()
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.settle()
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        self.settle()
    }
}

/// Delay that returns at once and tallies the requested time
#[derive(Default)]
pub struct NoopDelay {
    pub total_ms: u32,
    pub calls: Vec<u32>,
}

impl DelayNs for NoopDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ms += ns / 1_000_000;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
        self.calls.push(ms);
    }
}

// =============================================================================
// Almanac device
// =============================================================================

/// Valid DMC context status carrying `crc`
pub fn context_status_bytestream(crc: u32) -> GnssContextStatusBytestream {
    let c = crc.to_le_bytes();
    [
        GnssDestination::Dmc.value(),
        GNSS_DMC_STATUS_MESSAGE,
        0x01,
        c[0],
        c[1],
        c[2],
        c[3],
        0x00,
        0x00,
    ]
}

/// In-memory almanac store with scripted faults
///
/// Queries and writes are numbered from zero in call order.
pub struct SimDevice<const N: usize> {
    /// CRC reported by the next status query
    pub crc: u32,
    /// CRC the store adopts on every successful write
    pub crc_after_write: Option<u32>,
    /// Every record received, in order
    pub writes: Vec<Vec<u8>>,
    pub queries: usize,
    pub fail_query_at: Option<usize>,
    pub corrupt_status_at: Option<usize>,
    pub fail_write_at: Option<usize>,
    write_calls: usize,
}

impl<const N: usize> SimDevice<N> {
    pub fn new(crc: u32) -> Self {
        Self {
            crc,
            crc_after_write: None,
            writes: Vec::new(),
            queries: 0,
            fail_query_at: None,
            corrupt_status_at: None,
            fail_write_at: None,
            write_calls: 0,
        }
    }

    /// Device whose CRC becomes `crc` once it receives data
    pub fn converging_to(initial: u32, crc: u32) -> Self {
        let mut dev = Self::new(initial);
        dev.crc_after_write = Some(crc);
        dev
    }

    pub fn transactions(&self) -> usize {
        self.queries + self.write_calls
    }
}

impl<const N: usize> AlmanacDevice for SimDevice<N> {
    const RECORD_SIZE: usize = N;

    async fn read_context_status(&mut self) -> Result<GnssContextStatusBytestream, RadioError> {
        let index = self.queries;
        self.queries += 1;

        if self.fail_query_at == Some(index) {
            return Err(RadioError::Spi);
        }
        let mut raw = context_status_bytestream(self.crc);
        if self.corrupt_status_at == Some(index) {
            raw[0] = GnssDestination::Host.value();
        }
        Ok(raw)
    }

    async fn write_record(&mut self, record: &[u8]) -> Result<(), RadioError> {
        let index = self.write_calls;
        self.write_calls += 1;

        if record.len() != N {
            return Err(RadioError::PayloadSizeMismatch(N, record.len()));
        }
        if self.fail_write_at == Some(index) {
            return Err(RadioError::Spi);
        }
        self.writes.push(record.to_vec());
        if let Some(crc) = self.crc_after_write {
            self.crc = crc;
        }
        Ok(())
    }
}
