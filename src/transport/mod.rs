//! Notification transport boundary.
//!
//! The wireless GATT stack itself lives outside this crate. What it needs from
//! us is defined here: the profile identifiers, a `Notifier` that pushes bytes
//! to the single connected consumer, and the characteristic handlers that
//! bridge transport events to the scheduler and the address lookup.

pub mod console;

use std::sync::Arc;

use anyhow::Result;

use crate::netaddr;
use crate::schedule::PeriodicScheduler;

pub use console::ConsoleNotifier;

/// Advertised device name.
pub const DEVICE_NAME: &str = "Rpi";
pub const SERVICE_UUID: &str = "00000001-1000-2000-3000-111122223333";
/// Read-only characteristic carrying the local address.
pub const ADDRESS_CHARACTERISTIC_UUID: &str = "00000002-1000-2000-3000-111122223333";
/// Notify-only characteristic carrying the label string.
pub const LABEL_CHARACTERISTIC_UUID: &str = "00000003-1000-2000-3000-111122223333";

/// Delivers a payload to the currently connected consumer.
///
/// The transport enforces at most one subscriber.
pub trait Notifier: Send + Sync {
    fn notify(&self, payload: &[u8]) -> Result<()>;
}

/// Handlers for the label characteristic's subscription events.
pub struct LabelCharacteristic {
    scheduler: Arc<PeriodicScheduler>,
}

impl LabelCharacteristic {
    pub fn new(scheduler: Arc<PeriodicScheduler>) -> Self {
        Self { scheduler }
    }

    pub fn uuid(&self) -> &'static str {
        LABEL_CHARACTERISTIC_UUID
    }

    /// A consumer subscribed: route results to `notifier` and arm the loop.
    pub fn on_subscribe(&self, notifier: Arc<dyn Notifier>) {
        log::info!("label consumer subscribed");
        self.scheduler.register(Arc::new(move |labels: &str| {
            if let Err(err) = notifier.notify(labels.as_bytes()) {
                log::warn!("failed to notify consumer: {:#}", err);
            }
        }));
        self.scheduler.resume();
    }

    /// The consumer went away: detach it and idle the loop.
    ///
    /// Once this returns the previous notifier is not called again.
    pub fn on_unsubscribe(&self) {
        log::info!("label consumer unsubscribed");
        self.scheduler.unregister();
        self.scheduler.pause();
    }
}

/// Read handler for the address characteristic.
#[derive(Clone, Copy, Debug, Default)]
pub struct AddressCharacteristic;

impl AddressCharacteristic {
    pub fn uuid(&self) -> &'static str {
        ADDRESS_CHARACTERISTIC_UUID
    }

    /// UTF-8 address, or the unknown-address sentinel. Never fails.
    pub fn on_read(&self) -> Vec<u8> {
        netaddr::local_address().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_uuids_share_the_base() {
        for uuid in [ADDRESS_CHARACTERISTIC_UUID, LABEL_CHARACTERISTIC_UUID] {
            assert_eq!(&uuid[8..], &SERVICE_UUID[8..]);
        }
        assert_ne!(ADDRESS_CHARACTERISTIC_UUID, LABEL_CHARACTERISTIC_UUID);
    }

    #[test]
    fn characteristics_report_their_uuids() {
        let scheduler = Arc::new(PeriodicScheduler::new(std::time::Duration::from_millis(5)));
        assert_eq!(LabelCharacteristic::new(scheduler).uuid(), LABEL_CHARACTERISTIC_UUID);
        assert_eq!(AddressCharacteristic.uuid(), ADDRESS_CHARACTERISTIC_UUID);
    }

    #[test]
    fn console_notifier_counts_sent_payloads() -> Result<()> {
        let console = ConsoleNotifier::new();
        console.notify(b"Stop, Yield")?;
        console.notify(b"Stop")?;
        assert_eq!(console.sent(), 2);
        Ok(())
    }

    #[test]
    fn address_read_is_text() {
        let bytes = AddressCharacteristic.on_read();
        let text = String::from_utf8(bytes).expect("utf-8");
        assert!(!text.is_empty());
    }
}
