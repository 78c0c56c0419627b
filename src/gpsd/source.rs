use crate::gpsd::protocol::{parse_event, WATCH_COMMAND};
use crate::types::GpsEvent;

use std::io::{BufRead, Write};

/// How long a gpsd read may block before the reader gets control back.
pub const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

#[derive(Debug)]
pub enum GpsdError {
    Connect {
        address: String,
        source: std::io::Error,
    },
    Io(std::io::Error),
    EndOfStream,
}
impl std::fmt::Display for GpsdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpsdError::Connect { address, source } => {
                write!(f, "Failed to connect to gpsd at {address}: {source}")
            }
            GpsdError::Io(error) => write!(f, "Error reading gpsd stream: {error}"),
            GpsdError::EndOfStream => write!(f, "gpsd closed the stream"),
        }
    }
}
impl std::error::Error for GpsdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpsdError::Connect { source, .. } => Some(source),
            GpsdError::Io(error) => Some(error),
            GpsdError::EndOfStream => None,
        }
    }
}

/// A subscribed stream of fix source events.
pub trait EventStream {
    /// `Ok(None)` means a line arrived that carries no event, or no complete line arrived
    /// before the read timed out.
    fn next_event(&mut self) -> Result<Option<GpsEvent>, GpsdError>;
}

/// Opens and subscribes a new event stream.
pub trait Connector {
    type Stream: EventStream;
    fn connect(&self) -> Result<Self::Stream, GpsdError>;
}

pub struct GpsdStream<R> {
    reader: R,
    // Bytes of a line cut short by a read timeout, completed by the next read.
    pending: Vec<u8>,
}
impl<R: BufRead> GpsdStream<R> {
    pub fn new(reader: R) -> Self {
        GpsdStream {
            reader,
            pending: Vec::new(),
        }
    }
}

impl<R: BufRead> EventStream for GpsdStream<R> {
    fn next_event(&mut self) -> Result<Option<GpsEvent>, GpsdError> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => Err(GpsdError::EndOfStream),
            Ok(_) => {
                let event = parse_event(&String::from_utf8_lossy(&self.pending));
                self.pending.clear();
                Ok(event)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                Ok(None)
            }
            Err(err) => Err(GpsdError::Io(err)),
        }
    }
}

pub struct GpsdConnector {
    host: String,
    port: u16,
}
impl GpsdConnector {
    #[must_use]
    pub fn new(host: String, port: u16) -> Self {
        GpsdConnector { host, port }
    }
}

impl Connector for GpsdConnector {
    type Stream = GpsdStream<std::io::BufReader<std::net::TcpStream>>;

    fn connect(&self) -> Result<Self::Stream, GpsdError> {
        let address = format!("{0}:{1}", self.host, self.port);
        log::info!("Connecting to gpsd at {address}.");
        let mut stream = std::net::TcpStream::connect(&address).map_err(|source| {
            GpsdError::Connect {
                address: address.clone(),
                source,
            }
        })?;
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .map_err(GpsdError::Io)?;
        stream
            .write_all(WATCH_COMMAND.as_bytes())
            .map_err(GpsdError::Io)?;
        log::info!("Subscribed to gpsd watch stream.");
        Ok(GpsdStream::new(std::io::BufReader::new(stream)))
    }
}

/// Keeps a subscription alive: any connect failure or stream termination drops the
/// stream, waits `reconnect_delay`, and resubscribes on the next poll.
///
/// The wait ends early once `shutdown` disconnects or delivers a message.
pub struct ReconnectingSource<C: Connector> {
    connector: C,
    stream: Option<C::Stream>,
    reconnect_delay: std::time::Duration,
    shutdown: crossbeam_channel::Receiver<()>,
}

impl<C: Connector> ReconnectingSource<C> {
    pub fn new(
        connector: C,
        reconnect_delay: std::time::Duration,
        shutdown: crossbeam_channel::Receiver<()>,
    ) -> Self {
        ReconnectingSource {
            connector,
            stream: None,
            reconnect_delay,
            shutdown,
        }
    }

    /// Returns the next event, or `None` when nothing usable was produced this round.
    pub fn poll(&mut self) -> Option<GpsEvent> {
        if self.stream.is_none() {
            match self.connector.connect() {
                Ok(stream) => self.stream = Some(stream),
                Err(err) => {
                    self.back_off(&err);
                    return None;
                }
            }
        }

        let stream = self.stream.as_mut()?;
        match stream.next_event() {
            Ok(event) => event,
            Err(err) => {
                self.stream = None;
                self.back_off(&err);
                None
            }
        }
    }

    fn back_off(&self, err: &GpsdError) {
        log::warn!(
            "{err}. Reconnecting in {} seconds.",
            self.reconnect_delay.as_secs()
        );
        match self.shutdown.recv_timeout(self.reconnect_delay) {
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::info!("Reconnect wait interrupted by shutdown.");
            }
        }
    }
}
