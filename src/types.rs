/// Minimum gpsd fix mode that carries a usable 2-D or 3-D position.
pub const MIN_USABLE_FIX_MODE: u8 = 2;

/// A single GPS reading as delivered by the fix source.
#[derive(Debug, PartialEq, Clone)]
pub struct Fix {
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub track_degrees: Option<f64>,
    pub fix_mode: u8,
}

impl Fix {
    /// Returns the position when the fix is actionable: a 2-D/3-D mode and both coordinates.
    #[must_use]
    pub fn position(&self) -> Option<(f64, f64)> {
        if self.fix_mode < MIN_USABLE_FIX_MODE {
            return None;
        }
        Some((self.latitude?, self.longitude?))
    }
}

/// Typed events produced by the fix source.
#[derive(Debug, PartialEq, Clone)]
pub enum GpsEvent {
    Fix(Fix),
    SatelliteCount(u8),
    SourceVersion(String),
}

/// Tracking device identifier, NUL padded to its fixed wire width.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct DeviceId([u8; DeviceId::WIDTH]);

impl DeviceId {
    pub const WIDTH: usize = 22;
    pub const PAD: u8 = 0x00;

    pub fn new(value: &str) -> Result<Self, DeviceIdError> {
        let bytes = value.as_bytes();
        if bytes.len() > Self::WIDTH {
            return Err(DeviceIdError::TooLong {
                value: value.to_string(),
                length: bytes.len(),
            });
        }
        let mut padded = [Self::PAD; Self::WIDTH];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(DeviceId(padded))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; Self::WIDTH] {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self
            .0
            .iter()
            .position(|byte| *byte == Self::PAD)
            .unwrap_or(Self::WIDTH);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

#[derive(Debug)]
pub enum DeviceIdError {
    TooLong { value: String, length: usize },
}
impl std::fmt::Display for DeviceIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceIdError::TooLong { value, length } => write!(
                f,
                "Device id '{value}' is {length} bytes, exceeds {} byte limit",
                DeviceId::WIDTH
            ),
        }
    }
}
impl std::error::Error for DeviceIdError {}
