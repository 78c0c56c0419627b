mod constants;

use crate::types::{DeviceId, Fix, MIN_USABLE_FIX_MODE};
use chrono::{Datelike, Timelike};
use constants::{
    BIT_COURSE, BIT_DATE, BIT_DEVICE_ID, BIT_FIX_STATUS, BIT_LATITUDE, BIT_LONGITUDE,
    BIT_REQUIRED, BIT_SATELLITES, BIT_SPEED, BIT_TIME, COMMAND_TYPE, FRACTIONAL_DEGREE_SCALE,
    HEADER_LENGTH, MASK_FIELD_MARKER, MESSAGE_TYPE, PROTOCOL_VERSION, TENTHS_SCALE,
    WHOLE_DEGREE_SCALE, YEAR_OFFSET,
};

#[derive(Debug, PartialEq)]
pub enum EncodeError {
    UnusableFix { fix_mode: u8 },
}
impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::UnusableFix { fix_mode } => {
                write!(f, "Refusing to encode unusable fix (mode {fix_mode})")
            }
        }
    }
}
impl std::error::Error for EncodeError {}

/// Accumulates the body and its field presence mask in ascending bit order.
struct MessageBuilder {
    field_mask: u32,
    body: Vec<u8>,
}

impl MessageBuilder {
    fn new() -> Self {
        MessageBuilder {
            field_mask: 0,
            body: Vec::with_capacity(64),
        }
    }

    fn field(&mut self, bit: u32, payload: &[u8]) {
        self.field_mask += 1 << bit;
        self.body.extend_from_slice(payload);
    }

    fn finish(self) -> Vec<u8> {
        let mut message = Vec::with_capacity(HEADER_LENGTH + self.body.len());
        message.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
        message.push(COMMAND_TYPE);
        message.push(MESSAGE_TYPE);
        message.push(MASK_FIELD_MARKER);
        message.extend_from_slice(&self.field_mask.to_be_bytes());
        message.extend_from_slice(&self.body);
        message
    }
}

/// Encodes an accepted fix into the tracking datagram.
///
/// The header is protocol version, command type, message type, mask marker and the
/// big-endian field mask. Body fields follow in ascending bit order and are present only
/// when their bit is set; the receiver parses strictly by the mask.
///
/// Total for any usable fix: a timestamp whose year cannot be carried as an offset from
/// 2000 drops both date and time, and a speed or course outside the u16 tenths range drops
/// that field.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(
    fix: &Fix,
    satellites_used: u8,
    device_id: &DeviceId,
) -> Result<Vec<u8>, EncodeError> {
    let Some((latitude, longitude)) = fix.position() else {
        return Err(EncodeError::UnusableFix {
            fix_mode: fix.fix_mode,
        });
    };

    let mut builder = MessageBuilder::new();
    builder.field(BIT_REQUIRED, &[]);
    builder.field(BIT_DEVICE_ID, device_id.as_bytes());

    let timestamp = fix.timestamp.and_then(|timestamp| {
        let year_offset = u8::try_from(timestamp.year() - YEAR_OFFSET).ok()?;
        Some((timestamp, year_offset))
    });

    if let Some((timestamp, year_offset)) = timestamp {
        builder.field(
            BIT_DATE,
            &[timestamp.day() as u8, timestamp.month() as u8, year_offset],
        );
    }

    builder.field(
        BIT_FIX_STATUS,
        &[u8::from(fix.fix_mode >= MIN_USABLE_FIX_MODE)],
    );
    builder.field(BIT_LATITUDE, &encode_coordinate(latitude).to_be_bytes());
    builder.field(BIT_LONGITUDE, &encode_coordinate(longitude).to_be_bytes());

    if let Some(speed) = fix.speed_knots.and_then(tenths) {
        builder.field(BIT_SPEED, &speed.to_be_bytes());
    }
    if let Some(course) = fix.track_degrees.and_then(tenths) {
        builder.field(BIT_COURSE, &course.to_be_bytes());
    }

    if let Some((timestamp, _)) = timestamp {
        builder.field(
            BIT_TIME,
            &[
                timestamp.hour() as u8,
                timestamp.minute() as u8,
                timestamp.second() as u8,
            ],
        );
    }

    builder.field(BIT_SATELLITES, &[satellites_used]);
    Ok(builder.finish())
}

/// Whole degrees times 10^6 plus the fractional part as minutes times 10^4, truncated.
///
/// The sign is carried by the two's complement value; there is no hemisphere flag.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_coordinate(degrees: f64) -> i32 {
    let whole = degrees.trunc();
    (whole * WHOLE_DEGREE_SCALE + (degrees - whole) * FRACTIONAL_DEGREE_SCALE) as i32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn tenths(value: f64) -> Option<u16> {
    let scaled = (value * TENTHS_SCALE).round();
    (0.0..=f64::from(u16::MAX))
        .contains(&scaled)
        .then_some(scaled as u16)
}
