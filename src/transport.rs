use crate::error::{Error, Result};

use std::net::{SocketAddr, UdpSocket};

/// Sends one datagram per call. Fire-and-forget: no acknowledgment, no retry.
pub trait Transport {
    fn send(&mut self, payload: &[u8]) -> Result<()>;
}

/// UDP transport towards the detector.
///
/// The socket is bound once and closed when the value is dropped.
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    pub fn connect(target: SocketAddr) -> Result<Self> {
        let local = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).map_err(Error::Transport)?;
        log::debug!("UDP socket bound on {:?}", socket.local_addr());
        Ok(UdpTransport { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.socket
            .send_to(payload, self.target)
            .map_err(Error::Transport)?;
        Ok(())
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        log::debug!("Closing the UDP socket towards {}", self.target);
    }
}

/// Keeps every payload in memory instead of sending it
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub datagrams: Vec<String>,
}

impl Transport for RecordingTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.datagrams
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(())
    }
}

/// Delivers the first `fail_at` payloads, then fails every send
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FailingTransport {
    pub delivered: Vec<String>,
    pub attempts: usize,
    fail_at: usize,
}

#[cfg(test)]
impl FailingTransport {
    pub fn new(fail_at: usize) -> Self {
        FailingTransport {
            fail_at,
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl Transport for FailingTransport {
    fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.attempts += 1;
        if self.delivered.len() >= self.fail_at {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.delivered
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(())
    }
}
