pub mod protocol;
pub mod source;
