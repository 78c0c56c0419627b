use std::net::ToSocketAddrs;

#[derive(Debug)]
pub enum TransmitterError {
    Resolve {
        destination: String,
        source: std::io::Error,
    },
    NoAddress(String),
    Socket {
        destination: String,
        source: std::io::Error,
    },
}
impl std::fmt::Display for TransmitterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransmitterError::Resolve {
                destination,
                source,
            } => write!(f, "Failed to resolve '{destination}': {source}"),
            TransmitterError::NoAddress(destination) => {
                write!(f, "'{destination}' resolved to no addresses")
            }
            TransmitterError::Socket {
                destination,
                source,
            } => write!(f, "Failed to open UDP socket to '{destination}': {source}"),
        }
    }
}
impl std::error::Error for TransmitterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransmitterError::Resolve { source, .. } | TransmitterError::Socket { source, .. } => {
                Some(source)
            }
            TransmitterError::NoAddress(_) => None,
        }
    }
}

/// Fire-and-forget UDP sender, connected to the tracking endpoint for the process lifetime.
pub struct Transmitter {
    socket: std::net::UdpSocket,
    destination: std::net::SocketAddr,
}

impl Transmitter {
    pub fn connect(host: &str, port: u16) -> Result<Self, TransmitterError> {
        let destination_name = format!("{host}:{port}");
        let destination = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransmitterError::Resolve {
                destination: destination_name.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| TransmitterError::NoAddress(destination_name.clone()))?;

        let local: std::net::SocketAddr = if destination.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = std::net::UdpSocket::bind(local)
            .and_then(|socket| socket.connect(destination).map(|()| socket))
            .map_err(|source| TransmitterError::Socket {
                destination: destination_name,
                source,
            })?;

        log::info!("Transmitter: reporting to {destination}.");
        Ok(Transmitter {
            socket,
            destination,
        })
    }

    /// Sends one datagram. Failures are logged and otherwise ignored.
    pub fn send(&self, message: &[u8]) {
        match self.socket.send(message) {
            Ok(sent) => log::debug!("Transmitter: sent {sent} bytes to {}", self.destination),
            Err(err) => log::warn!(
                "Transmitter: failed to send report to {}: {err}",
                self.destination
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Transmitter;

    fn bind_receiver() -> (std::net::UdpSocket, u16) {
        let receiver = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();
        (receiver, port)
    }

    #[test]
    fn when_sending_then_datagram_arrives_unchanged() {
        let (receiver, port) = bind_receiver();
        let transmitter = Transmitter::connect("127.0.0.1", port).unwrap();

        transmitter.send(&[0x00, 0x05, 0x02, 0x10, 0x04]);

        let mut buffer = [0u8; 64];
        let received = receiver.recv(&mut buffer).unwrap();
        assert_eq!(&buffer[..received], &[0x00, 0x05, 0x02, 0x10, 0x04]);
    }

    #[test]
    fn when_sending_several_then_order_is_preserved() {
        let (receiver, port) = bind_receiver();
        let transmitter = Transmitter::connect("127.0.0.1", port).unwrap();

        for index in 0u8..3 {
            transmitter.send(&[index]);
        }

        let mut buffer = [0u8; 8];
        for index in 0u8..3 {
            let received = receiver.recv(&mut buffer).unwrap();
            assert_eq!(&buffer[..received], &[index]);
        }
    }

    #[test]
    fn when_nobody_listens_then_send_does_not_panic() {
        let (receiver, port) = bind_receiver();
        drop(receiver);
        let transmitter = Transmitter::connect("127.0.0.1", port).unwrap();

        transmitter.send(&[1, 2, 3]);
        transmitter.send(&[4, 5, 6]);
    }
}
