//! An in-process channel made of two connected transports.

use crate::{
    config::INITIAL_TIMEOUT,
    transport::{Received, RecvTimer, Transport},
};
use bytes::Bytes;
use futures::{prelude::*, sync::mpsc, try_ready};
use log::trace;
use std::{io::Error, time::Duration};

/// One end of an in-memory channel.
///
/// The channel itself never loses or reorders datagrams. Wrap it in a
/// `Lossy` to inject faults.
#[derive(Debug)]
pub struct MemoryTransport {
    /// Set once the peer has been dropped. From then on only the timer can
    /// resolve a receive.
    closed: bool,
    recv: mpsc::UnboundedReceiver<Bytes>,
    send: mpsc::UnboundedSender<Bytes>,
    timer: RecvTimer,
}

/// Creates two transports connected to each other.
pub fn pair() -> (MemoryTransport, MemoryTransport) {
    let (a_tx, a_rx) = mpsc::unbounded();
    let (b_tx, b_rx) = mpsc::unbounded();

    (MemoryTransport::new(a_tx, b_rx), MemoryTransport::new(b_tx, a_rx))
}

impl MemoryTransport {
    fn new(
        send: mpsc::UnboundedSender<Bytes>,
        recv: mpsc::UnboundedReceiver<Bytes>,
    ) -> Self {
        MemoryTransport {
            closed: false,
            recv,
            send,
            timer: RecvTimer::new(INITIAL_TIMEOUT),
        }
    }
}

impl Transport for MemoryTransport {
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), Error> {
        if self.send.unbounded_send(Bytes::from(datagram)).is_err() {
            trace!("discarding datagram, peer has gone away");
        }

        Ok(Async::Ready(()))
    }

    fn poll_recv(&mut self) -> Poll<Received, Error> {
        if !self.closed {
            match self.recv.poll() {
                Ok(Async::Ready(Some(datagram))) => {
                    self.timer.disarm();
                    return Ok(Async::Ready(Received::Datagram(datagram)));
                }
                Ok(Async::Ready(None)) | Err(()) => self.closed = true,
                Ok(Async::NotReady) => {}
            }
        }

        try_ready!(self.timer.poll_elapsed());
        Ok(Async::Ready(Received::TimedOut))
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timer.set_timeout(timeout);
    }
}
