use crate::types::{Fix, GpsEvent};

pub const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\r\n";

const KNOTS_PER_METER_PER_SECOND: f64 = 3600.0 / 1852.0;

/// gpsd JSON reports, tagged by their `class` member.
#[derive(serde::Deserialize, Debug, PartialEq)]
#[serde(tag = "class")]
pub enum Report {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(rename = "SKY")]
    Sky(Sky),
    #[serde(rename = "VERSION")]
    Version(Version),
    #[serde(other)]
    Other,
}

#[derive(serde::Deserialize, Debug, PartialEq, Default)]
pub struct Tpv {
    #[serde(default)]
    pub mode: u8,
    pub time: Option<chrono::DateTime<chrono::Utc>>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    #[serde(rename = "altMSL")]
    pub alt_msl: Option<f64>,
    /// Meters per second.
    pub speed: Option<f64>,
    pub track: Option<f64>,
}

#[derive(serde::Deserialize, Debug, PartialEq, Default)]
pub struct Sky {
    #[serde(rename = "uSat")]
    pub used_satellites: Option<u8>,
    pub satellites: Option<Vec<Satellite>>,
}

#[derive(serde::Deserialize, Debug, PartialEq, Default)]
pub struct Satellite {
    #[serde(default)]
    pub used: bool,
}

#[derive(serde::Deserialize, Debug, PartialEq, Default)]
pub struct Version {
    #[serde(default)]
    pub release: String,
    #[serde(default)]
    pub rev: String,
    #[serde(default)]
    pub proto_major: u32,
    #[serde(default)]
    pub proto_minor: u32,
}

impl From<Tpv> for Fix {
    fn from(tpv: Tpv) -> Self {
        Fix {
            timestamp: tpv.time,
            latitude: tpv.lat,
            longitude: tpv.lon,
            altitude: tpv.alt_msl.or(tpv.alt),
            speed_knots: tpv.speed.map(|speed| speed * KNOTS_PER_METER_PER_SECOND),
            track_degrees: tpv.track,
            fix_mode: tpv.mode,
        }
    }
}

impl Sky {
    /// Used satellite count, or `None` when the report carries no satellite data at all
    /// (gpsd also sends DOP-only SKY reports).
    #[must_use]
    pub fn satellites_used(&self) -> Option<u8> {
        if let Some(used) = self.used_satellites {
            return Some(used);
        }
        let used = self.satellites.as_ref()?.iter().filter(|sat| sat.used).count();
        Some(u8::try_from(used).unwrap_or(u8::MAX))
    }
}

impl Report {
    #[must_use]
    pub fn into_event(self) -> Option<GpsEvent> {
        match self {
            Report::Tpv(tpv) => Some(GpsEvent::Fix(tpv.into())),
            Report::Sky(sky) => sky.satellites_used().map(GpsEvent::SatelliteCount),
            Report::Version(version) => Some(GpsEvent::SourceVersion(format!(
                "gpsd {0} (rev {1}, protocol {2}.{3})",
                version.release, version.rev, version.proto_major, version.proto_minor
            ))),
            Report::Other => None,
        }
    }
}

/// Parses one line of the gpsd watch stream into a domain event.
///
/// Lines that are not JSON or carry a class the bridge does not use yield `None`.
#[must_use]
pub fn parse_event(line: &str) -> Option<GpsEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<Report>(line) {
        Ok(report) => report.into_event(),
        Err(err) => {
            log::debug!("Discarding unparsable gpsd line: {err}");
            None
        }
    }
}
