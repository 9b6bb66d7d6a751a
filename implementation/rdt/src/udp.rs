//! A transport over a connected UDP socket.

use crate::{
    config::INITIAL_TIMEOUT,
    transport::{Received, RecvTimer, Transport},
    ResultExt,
};
use bytes::Bytes;
use futures::{prelude::*, try_ready};
use log::trace;
use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
    time::Duration,
};
use tokio::net::UdpSocket;

/// The largest datagram we're prepared to receive.
const UDP_DGRAM_SIZE: usize = 64 * 1024;

/// A UDP socket bound locally and connected to a single peer.
///
/// Datagrams from other sources are filtered by the operating system.
#[derive(Debug)]
pub struct UdpTransport {
    recv_buf: Vec<u8>,
    socket: UdpSocket,
    timer: RecvTimer,
}

impl UdpTransport {
    /// Binds a socket to `local` and connects it to `remote`.
    pub fn bind(local: &SocketAddr, remote: &SocketAddr) -> io::Result<Self> {
        UdpSocket::bind(local)
            .inspect_mut(|s| s.connect(remote))
            .map(Self::from_socket)
    }

    /// Wraps an already connected socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        UdpTransport {
            recv_buf: vec![0; UDP_DGRAM_SIZE],
            socket,
            timer: RecvTimer::new(INITIAL_TIMEOUT),
        }
    }

    /// The address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), io::Error> {
        let written = match self.socket.poll_send(datagram) {
            Ok(Async::Ready(n)) => n,
            Ok(Async::NotReady) => return Ok(Async::NotReady),

            // An earlier datagram bounced off a closed port. Sending is
            // best-effort, so this one counts as lost as well.
            Err(ref e) if e.kind() == ErrorKind::ConnectionRefused => {
                trace!("peer refused datagram");
                return Ok(Async::Ready(()));
            }
            Err(e) => return Err(e),
        };
        if written != datagram.len() {
            return Err(io::Error::new(
                ErrorKind::WriteZero,
                "datagram was truncated",
            ));
        }

        Ok(Async::Ready(()))
    }

    fn poll_recv(&mut self) -> Poll<Received, io::Error> {
        loop {
            match self.socket.poll_recv(&mut self.recv_buf) {
                Ok(Async::Ready(nread)) => {
                    self.timer.disarm();

                    let datagram = Bytes::from(&self.recv_buf[..nread]);
                    return Ok(Async::Ready(Received::Datagram(datagram)));
                }
                Ok(Async::NotReady) => break,

                // The peer isn't listening (yet). To us this is the same as
                // the datagram being lost.
                Err(ref e) if e.kind() == ErrorKind::ConnectionRefused => {
                    trace!("peer refused datagram");
                }
                Err(e) => return Err(e),
            }
        }

        try_ready!(self.timer.poll_elapsed());
        Ok(Async::Ready(Received::TimedOut))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timer.set_timeout(timeout);
    }
}
