pub mod cli;
pub mod config;
pub mod encoder;
pub mod gpsd;
pub mod logging;
pub mod position;
pub mod rendezvous;
pub mod reporter;
pub mod thread_manager;
pub mod throttle;
pub mod transmitter;
pub mod types;
