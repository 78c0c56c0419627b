pub const PROTOCOL_VERSION: u16 = 5;
pub const COMMAND_TYPE: u8 = 2;
pub const MESSAGE_TYPE: u8 = 16;
pub const MASK_FIELD_MARKER: u8 = 4;

pub const HEADER_LENGTH: usize = 9;

// Field presence bits, in emission order.
pub const BIT_REQUIRED: u32 = 0;
pub const BIT_DEVICE_ID: u32 = 2;
pub const BIT_DATE: u32 = 8;
pub const BIT_FIX_STATUS: u32 = 9;
pub const BIT_LATITUDE: u32 = 10;
pub const BIT_LONGITUDE: u32 = 11;
pub const BIT_SPEED: u32 = 12;
pub const BIT_COURSE: u32 = 13;
pub const BIT_TIME: u32 = 14;
pub const BIT_SATELLITES: u32 = 16;

pub const WHOLE_DEGREE_SCALE: f64 = 1_000_000.0;
// Fractional degrees expressed as minutes * 10^4.
pub const FRACTIONAL_DEGREE_SCALE: f64 = 600_000.0;
pub const TENTHS_SCALE: f64 = 10.0;
pub const YEAR_OFFSET: i32 = 2000;
