//! Modem event handlers
//!
//! The modem engine reports what happened during a tick as [`ModemEvent`]s.
//! Applications register one optional handler per event kind in an
//! [`EventHandlers`] table; events without a handler are dropped.
//!
//! ```ignore
//! fn on_reset(count: u16) {
//!     info!("modem reset #{}", count);
//! }
//!
//! let handlers = EventHandlers {
//!     reset: Some(on_reset),
//!     ..EventHandlers::new()
//! };
//! ```

/// Result of an uplink
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum TxDoneStatus {
    NotSent,
    Sent,
    Confirmed,
}

/// Downlink delivered to the application
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Downlink<'a> {
    pub port: u8,
    pub payload: &'a [u8],
    pub rssi: i16,
    pub snr: i8,
}

/// Events raised by the modem engine
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ModemEvent<'a> {
    /// Modem (re)started
    Reset { reset_count: u16 },
    Alarm,
    Joined,
    JoinFail,
    TxDone(TxDoneStatus),
    DownData(Downlink<'a>),
    UploadDone { successful: bool },
    /// A configuration item changed
    SetConf { tag: u8 },
    Mute { muted: bool },
    StreamDone,
    TimeUpdatedAlcSync { synchronized: bool },
    AdrMobileToStatic,
    NewLinkAdr,
    LinkStatus { received: bool },
    /// Almanac update service finished a step
    AlmanacUpdate { complete: bool },
    /// Radio released for direct use by the application
    UserRadioAccess { timestamp_ms: u32, status: u32 },
    Middleware1 { event: u8 },
}

/// One optional handler per event kind
#[derive(Clone, Copy, Default)]
pub struct EventHandlers {
    pub reset: Option<fn(u16)>,
    pub alarm: Option<fn()>,
    pub joined: Option<fn()>,
    pub join_fail: Option<fn()>,
    pub tx_done: Option<fn(TxDoneStatus)>,
    pub down_data: Option<fn(&Downlink<'_>)>,
    pub upload_done: Option<fn(bool)>,
    pub set_conf: Option<fn(u8)>,
    pub mute: Option<fn(bool)>,
    pub stream_done: Option<fn()>,
    pub time_updated_alc_sync: Option<fn(bool)>,
    pub adr_mobile_to_static: Option<fn()>,
    pub new_link_adr: Option<fn()>,
    pub link_status: Option<fn(bool)>,
    pub almanac_update: Option<fn(bool)>,
    pub user_radio_access: Option<fn(u32, u32)>,
    pub middleware_1: Option<fn(u8)>,
}

impl EventHandlers {
    /// Table with no handlers
    pub const fn new() -> Self {
        Self {
            reset: None,
            alarm: None,
            joined: None,
            join_fail: None,
            tx_done: None,
            down_data: None,
            upload_done: None,
            set_conf: None,
            mute: None,
            stream_done: None,
            time_updated_alc_sync: None,
            adr_mobile_to_static: None,
            new_link_adr: None,
            link_status: None,
            almanac_update: None,
            user_radio_access: None,
            middleware_1: None,
        }
    }

    /// Call the handler registered for `event`
    ///
    /// Returns `false` when no handler is registered.
    pub fn dispatch(&self, event: &ModemEvent<'_>) -> bool {
        let handled = match *event {
            ModemEvent::Reset { reset_count } => self.reset.map(|f| f(reset_count)),
            ModemEvent::Alarm => self.alarm.map(|f| f()),
            ModemEvent::Joined => self.joined.map(|f| f()),
            ModemEvent::JoinFail => self.join_fail.map(|f| f()),
            ModemEvent::TxDone(status) => self.tx_done.map(|f| f(status)),
            ModemEvent::DownData(ref downlink) => self.down_data.map(|f| f(downlink)),
            ModemEvent::UploadDone { successful } => self.upload_done.map(|f| f(successful)),
            ModemEvent::SetConf { tag } => self.set_conf.map(|f| f(tag)),
            ModemEvent::Mute { muted } => self.mute.map(|f| f(muted)),
            ModemEvent::StreamDone => self.stream_done.map(|f| f()),
            ModemEvent::TimeUpdatedAlcSync { synchronized } => {
                self.time_updated_alc_sync.map(|f| f(synchronized))
            }
            ModemEvent::AdrMobileToStatic => self.adr_mobile_to_static.map(|f| f()),
            ModemEvent::NewLinkAdr => self.new_link_adr.map(|f| f()),
            ModemEvent::LinkStatus { received } => self.link_status.map(|f| f(received)),
            ModemEvent::AlmanacUpdate { complete } => self.almanac_update.map(|f| f(complete)),
            ModemEvent::UserRadioAccess {
                timestamp_ms,
                status,
            } => self.user_radio_access.map(|f| f(timestamp_ms, status)),
            ModemEvent::Middleware1 { event } => self.middleware_1.map(|f| f(event)),
        };

        if handled.is_none() {
            trace!("Unhandled modem event {:?}", event);
        }
        handled.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};

    static RESETS: AtomicU32 = AtomicU32::new(0);
    static LAST_PORT: AtomicU32 = AtomicU32::new(0);
    static LAST_RADIO_ACCESS: AtomicU32 = AtomicU32::new(0);

    fn on_reset(count: u16) {
        RESETS.fetch_add(count as u32, Ordering::SeqCst);
    }

    fn on_down_data(downlink: &Downlink<'_>) {
        LAST_PORT.store(downlink.port as u32 + downlink.payload.len() as u32, Ordering::SeqCst);
    }

    fn on_user_radio_access(timestamp_ms: u32, status: u32) {
        LAST_RADIO_ACCESS.store(timestamp_ms + status, Ordering::SeqCst);
    }

    #[test]
    fn test_empty_table_handles_nothing() {
        let handlers = EventHandlers::new();
        assert!(!handlers.dispatch(&ModemEvent::Reset { reset_count: 1 }));
        assert!(!handlers.dispatch(&ModemEvent::Joined));
        assert!(!handlers.dispatch(&ModemEvent::AlmanacUpdate { complete: true }));
    }

    #[test]
    fn test_registered_handlers_receive_payload() {
        let handlers = EventHandlers {
            reset: Some(on_reset),
            down_data: Some(on_down_data),
            user_radio_access: Some(on_user_radio_access),
            ..EventHandlers::default()
        };

        assert!(handlers.dispatch(&ModemEvent::Reset { reset_count: 3 }));
        assert_eq!(RESETS.load(Ordering::SeqCst), 3);

        let payload = [1u8, 2, 3, 4];
        let event = ModemEvent::DownData(Downlink {
            port: 10,
            payload: &payload,
            rssi: -80,
            snr: 7,
        });
        assert!(handlers.dispatch(&event));
        assert_eq!(LAST_PORT.load(Ordering::SeqCst), 14);

        assert!(handlers.dispatch(&ModemEvent::UserRadioAccess {
            timestamp_ms: 1000,
            status: 2
        }));
        assert_eq!(LAST_RADIO_ACCESS.load(Ordering::SeqCst), 1002);

        // unregistered kinds in the same table are still ignored
        assert!(!handlers.dispatch(&ModemEvent::TxDone(TxDoneStatus::Sent)));
    }
}
