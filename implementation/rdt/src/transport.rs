//! The channel abstraction both roles are driven over.

use bytes::Bytes;
use futures::prelude::*;
use std::{
    io::{Error, ErrorKind},
    time::Duration,
};
use tokio::{clock, timer::Delay};

/// The result of waiting for a datagram.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Received {
    /// A datagram arrived. Its contents have not been validated.
    Datagram(Bytes),

    /// Nothing arrived within the configured timeout.
    TimedOut,
}

/// An unreliable, connected datagram channel.
///
/// Datagrams may be lost, corrupted, duplicated or delayed. Receiving is
/// bounded by a timeout that can be changed at any time.
pub trait Transport {
    /// Attempts to send a datagram to the peer.
    ///
    /// Completing doesn't imply the datagram will arrive.
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), Error>;

    /// Attempts to receive a datagram from the peer.
    ///
    /// Resolves with `Received::TimedOut` if no datagram arrives within the
    /// current timeout. The timeout is armed on the first poll of every wait.
    fn poll_recv(&mut self) -> Poll<Received, Error>;

    /// Sets the timeout for subsequent waits.
    fn set_timeout(&mut self, timeout: Duration);
}

/// The timeout half of a receive operation.
///
/// Transports poll this after finding no datagram. The timer is armed lazily,
/// so a wait starts on its first poll, and disarmed whenever the wait
/// resolves.
#[derive(Debug)]
pub struct RecvTimer {
    delay: Option<Delay>,
    timeout: Duration,
}

impl RecvTimer {
    pub fn new(timeout: Duration) -> Self {
        RecvTimer {
            delay: None,
            timeout,
        }
    }

    /// Ends the current wait without it having elapsed.
    pub fn disarm(&mut self) {
        self.delay = None;
    }

    /// Polls the current wait, arming it if necessary.
    ///
    /// # Panics
    ///
    /// Panics if not called within a tokio runtime with a timer.
    pub fn poll_elapsed(&mut self) -> Poll<(), Error> {
        let timeout = self.timeout;
        let delay = self
            .delay
            .get_or_insert_with(|| Delay::new(clock::now() + timeout));

        match delay.poll() {
            Ok(Async::Ready(())) => {
                self.delay = None;
                Ok(Async::Ready(()))
            }
            Ok(Async::NotReady) => Ok(Async::NotReady),
            Err(e) => Err(Error::new(ErrorKind::Other, e)),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), Error> {
        (**self).poll_send(datagram)
    }

    fn poll_recv(&mut self) -> Poll<Received, Error> {
        (**self).poll_recv()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        (**self).set_timeout(timeout)
    }
}
