use crate::thread_manager::SteppableTask;
use crate::throttle::{decide, Decision, ThrottlePolicy, ThrottleState};
use crate::types::Fix;

/// Writer half of the shared throttle state. Owned by the fix reporter.
pub struct PositionStore {
    inner: std::sync::Arc<std::sync::RwLock<ThrottleState>>,
}
impl PositionStore {
    #[must_use]
    pub fn new() -> Self {
        PositionStore {
            inner: std::sync::Arc::new(std::sync::RwLock::new(ThrottleState::new())),
        }
    }

    #[must_use]
    pub fn get_position_viewer(&self) -> PositionViewer {
        PositionViewer {
            inner: self.inner.clone(),
        }
    }

    /// Runs the throttle decision and records an accepted fix under one write lock, so
    /// readers never observe a candidate that has not been accepted.
    pub fn decide_and_record(
        &self,
        candidate: &Fix,
        now: chrono::DateTime<chrono::Utc>,
        policy: &ThrottlePolicy,
    ) -> Decision {
        let mut state = self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let decision = decide(&state, candidate, now, policy);
        if decision.is_accept() {
            state.accept(candidate.clone(), now);
        }
        decision
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        PositionStore::new()
    }
}

#[derive(Clone)]
pub struct PositionViewer {
    inner: std::sync::Arc<std::sync::RwLock<ThrottleState>>,
}
impl PositionViewer {
    /// Human readable last accepted position, or an empty string when there is none.
    #[must_use]
    pub fn render(&self) -> String {
        match self.inner.read() {
            Ok(state) => state.last_accepted_fix().map(render_fix).unwrap_or_default(),
            Err(err) => {
                log::warn!("Position state unavailable, rendering empty position: {err}");
                String::new()
            }
        }
    }
}

/// Formats a fix as `50.087451N 14.420671E 235.0m`; altitude only when known.
#[must_use]
pub fn render_fix(fix: &Fix) -> String {
    let Some((latitude, longitude)) = fix.position() else {
        return String::new();
    };
    let latitude_hemisphere = if latitude < 0.0 { 'S' } else { 'N' };
    let longitude_hemisphere = if longitude < 0.0 { 'W' } else { 'E' };
    let mut text = format!(
        "{:.6}{latitude_hemisphere} {:.6}{longitude_hemisphere}",
        latitude.abs(),
        longitude.abs()
    );
    if let Some(altitude) = fix.altitude {
        text.push_str(&format!(" {altitude:.1}m"));
    }
    text
}

/// Marker sent by the rendezvous worker when it wants the current position text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest;

/// Answers render requests from the shared state on its own thread.
pub struct PositionResponder {
    viewer: PositionViewer,
    request_receiver: crossbeam_channel::Receiver<RenderRequest>,
    reply_sender: crossbeam_channel::Sender<String>,
}
impl PositionResponder {
    #[must_use]
    pub fn new(
        viewer: PositionViewer,
        request_receiver: crossbeam_channel::Receiver<RenderRequest>,
        reply_sender: crossbeam_channel::Sender<String>,
    ) -> Self {
        PositionResponder {
            viewer,
            request_receiver,
            reply_sender,
        }
    }
}

impl SteppableTask for PositionResponder {
    fn step(&mut self) -> bool {
        let Ok(RenderRequest) = self.request_receiver.recv() else {
            log::info!("PositionResponder: requester disconnected");
            return false;
        };
        if let Err(err) = self.reply_sender.send(self.viewer.render()) {
            log::warn!("PositionResponder: failed to deliver rendering: {err}");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{render_fix, PositionResponder, PositionStore, RenderRequest};
    use crate::thread_manager::SteppableTask;
    use crate::throttle::{Decision, RejectReason, ThrottlePolicy};
    use crate::types::Fix;

    fn fix_at(latitude: f64, longitude: f64, altitude: Option<f64>) -> Fix {
        Fix {
            timestamp: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude,
            speed_knots: None,
            track_degrees: None,
            fix_mode: 3,
        }
    }

    fn policy() -> ThrottlePolicy {
        ThrottlePolicy {
            report_interval: chrono::TimeDelta::seconds(5),
            max_report_interval: chrono::TimeDelta::seconds(60),
            min_distance_meters: 10.0,
        }
    }

    #[test]
    fn when_no_fix_accepted_then_rendering_is_empty() {
        let store = PositionStore::new();
        assert_eq!(store.get_position_viewer().render(), "");
    }

    #[test]
    fn when_rendering_then_hemisphere_letters_and_altitude_are_shown() {
        assert_eq!(
            render_fix(&fix_at(50.087451, 14.420671, Some(235.0))),
            "50.087451N 14.420671E 235.0m"
        );
        assert_eq!(
            render_fix(&fix_at(-33.86882, -70.669265, None)),
            "33.868820S 70.669265W"
        );
    }

    #[test]
    fn when_candidate_rejected_then_viewer_keeps_last_accepted_fix() {
        let store = PositionStore::new();
        let viewer = store.get_position_viewer();
        let now = chrono::Utc::now();

        let accepted = fix_at(50.0, 14.0, None);
        assert!(store.decide_and_record(&accepted, now, &policy()).is_accept());

        let candidate = fix_at(51.0, 14.0, None);
        let decision =
            store.decide_and_record(&candidate, now + chrono::TimeDelta::seconds(1), &policy());

        assert_eq!(decision, Decision::Reject(RejectReason::RateLimited));
        assert_eq!(viewer.render(), render_fix(&accepted));
    }

    #[test]
    fn when_request_received_then_responder_replies_with_rendering() {
        let store = PositionStore::new();
        let (request_sender, request_receiver) = crossbeam_channel::bounded(1);
        let (reply_sender, reply_receiver) = crossbeam_channel::bounded(1);
        let mut responder =
            PositionResponder::new(store.get_position_viewer(), request_receiver, reply_sender);

        request_sender.send(RenderRequest).unwrap();
        assert!(responder.step());
        assert_eq!(reply_receiver.recv().unwrap(), "");

        store.decide_and_record(&fix_at(1.5, 2.5, Some(10.0)), chrono::Utc::now(), &policy());
        request_sender.send(RenderRequest).unwrap();
        assert!(responder.step());
        assert_eq!(reply_receiver.recv().unwrap(), "1.500000N 2.500000E 10.0m");
    }

    #[test]
    fn when_requester_disconnects_then_responder_finishes() {
        let store = PositionStore::new();
        let (request_sender, request_receiver) = crossbeam_channel::bounded(1);
        let (reply_sender, _reply_receiver) = crossbeam_channel::bounded(1);
        let mut responder =
            PositionResponder::new(store.get_position_viewer(), request_receiver, reply_sender);

        drop(request_sender);
        assert!(!responder.step());
    }
}
