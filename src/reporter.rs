use crate::encoder::encode;
use crate::gpsd::source::{Connector, ReconnectingSource};
use crate::position::PositionStore;
use crate::thread_manager::SteppableTask;
use crate::throttle::{Decision, ThrottlePolicy};
use crate::transmitter::Transmitter;
use crate::types::{DeviceId, Fix, GpsEvent};

/// Primary context: consumes fix source events and reports accepted fixes in order.
pub struct FixReporter<C: Connector> {
    source: ReconnectingSource<C>,
    store: PositionStore,
    policy: ThrottlePolicy,
    device_id: DeviceId,
    satellites_used: u8,
    transmitter: Transmitter,
}

impl<C: Connector> FixReporter<C> {
    pub fn new(
        source: ReconnectingSource<C>,
        store: PositionStore,
        policy: ThrottlePolicy,
        device_id: DeviceId,
        transmitter: Transmitter,
    ) -> Self {
        FixReporter {
            source,
            store,
            policy,
            device_id,
            satellites_used: 0,
            transmitter,
        }
    }

    pub fn handle_event(&mut self, event: GpsEvent, now: chrono::DateTime<chrono::Utc>) {
        match event {
            GpsEvent::Fix(fix) => self.handle_fix(&fix, now),
            GpsEvent::SatelliteCount(count) => self.satellites_used = count,
            GpsEvent::SourceVersion(version) => log::info!("FixReporter: connected to {version}"),
        }
    }

    fn handle_fix(&self, fix: &Fix, now: chrono::DateTime<chrono::Utc>) {
        let reason = match self.store.decide_and_record(fix, now, &self.policy) {
            Decision::Accept(reason) => reason,
            Decision::Reject(reason) => {
                log::debug!("FixReporter: fix rejected ({reason:?})");
                return;
            }
        };

        match encode(fix, self.satellites_used, &self.device_id) {
            Ok(message) => {
                log::info!(
                    "FixReporter: reporting fix ({reason:?}, {} satellites)",
                    self.satellites_used
                );
                self.transmitter.send(&message);
            }
            Err(err) => log::warn!("FixReporter: {err}"),
        }
    }
}

impl<C> SteppableTask for FixReporter<C>
where
    C: Connector + Send + 'static,
    C::Stream: Send + 'static,
{
    fn step(&mut self) -> bool {
        if let Some(event) = self.source.poll() {
            self.handle_event(event, chrono::Utc::now());
        }
        true
    }
}
