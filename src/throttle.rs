use crate::types::Fix;

const EARTH_MEAN_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    pub report_interval: chrono::TimeDelta,
    pub max_report_interval: chrono::TimeDelta,
    pub min_distance_meters: f64,
}

/// The last accepted fix and when it was accepted. Only written on an accept decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleState {
    last_accepted_fix: Option<Fix>,
    last_accepted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ThrottleState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_accepted_fix(&self) -> Option<&Fix> {
        self.last_accepted_fix.as_ref()
    }

    pub fn accept(&mut self, fix: Fix, now: chrono::DateTime<chrono::Utc>) {
        self.last_accepted_fix = Some(fix);
        self.last_accepted_at = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    First,
    Heartbeat,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unusable,
    RateLimited,
    TooClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept(AcceptReason),
    Reject(RejectReason),
}

impl Decision {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

/// Decides whether `candidate` is worth reporting given the last accepted fix.
///
/// Order of checks: unusable fixes are always rejected, then the heartbeat
/// (`max_report_interval`) forces an accept, then the `report_interval` floor rejects,
/// then movement below `min_distance_meters` rejects.
#[must_use]
pub fn decide(
    state: &ThrottleState,
    candidate: &Fix,
    now: chrono::DateTime<chrono::Utc>,
    policy: &ThrottlePolicy,
) -> Decision {
    let Some(candidate_position) = candidate.position() else {
        return Decision::Reject(RejectReason::Unusable);
    };

    let (Some(last_fix), Some(last_at)) = (&state.last_accepted_fix, state.last_accepted_at)
    else {
        return Decision::Accept(AcceptReason::First);
    };

    let elapsed = now - last_at;
    if elapsed >= policy.max_report_interval {
        return Decision::Accept(AcceptReason::Heartbeat);
    }
    if elapsed < policy.report_interval {
        return Decision::Reject(RejectReason::RateLimited);
    }

    if let Some(last_position) = last_fix.position() {
        if haversine_distance_m(last_position, candidate_position) < policy.min_distance_meters {
            return Decision::Reject(RejectReason::TooClose);
        }
    }
    Decision::Accept(AcceptReason::Moved)
}

/// Great-circle distance in meters between two `(latitude, longitude)` pairs in degrees.
#[must_use]
pub fn haversine_distance_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat_1, lon_1) = (from.0.to_radians(), from.1.to_radians());
    let (lat_2, lon_2) = (to.0.to_radians(), to.1.to_radians());
    let half_dlat = (lat_2 - lat_1) / 2.0;
    let half_dlon = (lon_2 - lon_1) / 2.0;

    let a = half_dlat.sin().powi(2) + lat_1.cos() * lat_2.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * a.sqrt().min(1.0).asin()
}
