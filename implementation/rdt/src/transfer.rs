//! Implements the future that sends a payload to the peer.

use crate::{
    config::Config,
    sender::{Outcome, Sender, SenderStats},
    transport::Transport,
};
use bytes::Bytes;
use futures::{prelude::*, try_ready};
use log::debug;
use std::{io::Error, time::Duration};

const POLLED_AFTER_COMPLETION: &str = "cannot poll Transfer after completion";

/// A future representing an outbound transfer.
///
/// Resolves once the peer has acknowledged every segment, or fails when the
/// peer has become unreachable.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Transfer<T> {
    sender: Sender,
    state: State,

    /// The timeout last applied to the transport.
    timeout: Duration,
    transport: T,
}

/// The internal state of the transfer future automaton.
#[derive(Debug)]
enum State {
    /// Nothing has been sent yet.
    Start,

    /// A segment needs to be put onto the wire.
    Transmit(Bytes),

    /// The segment has been sent and we're waiting for the response.
    AwaitAck,

    /// The future has resolved.
    Done,
}

impl<T: Transport> Transfer<T> {
    /// Creates a transfer of `payload` over `transport`.
    ///
    /// Nothing is sent until the future is polled.
    pub fn new(transport: T, payload: Bytes, config: Config) -> Self {
        Self::from_sender(transport, Sender::new(payload, &config))
    }

    /// Creates a transfer driving an existing sender automaton.
    pub fn from_sender(mut transport: T, sender: Sender) -> Self {
        let timeout = sender.timeout();
        transport.set_timeout(timeout);

        Transfer {
            sender,
            state: State::Start,
            timeout,
            transport,
        }
    }

    /// Gets a reference to the sender automaton.
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Gets a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Pushes a changed retransmission timeout down to the transport.
    fn sync_timeout(&mut self) {
        let timeout = self.sender.timeout();
        if timeout != self.timeout {
            self.transport.set_timeout(timeout);
            self.timeout = timeout;
        }
    }

    /// Advances the automaton to the given outcome.
    fn enter(&mut self, outcome: Outcome) -> Option<SenderStats> {
        match outcome {
            Outcome::Transmit(datagram) => {
                self.state = State::Transmit(datagram);
                None
            }
            Outcome::Complete => {
                debug!("transfer complete: {:?}", self.sender.stats());

                self.state = State::Done;
                Some(*self.sender.stats())
            }
        }
    }
}

impl<T: Transport> Future for Transfer<T> {
    type Item = SenderStats;
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        loop {
            let outcome = match &mut self.state {
                State::Start => self.sender.start(),
                State::Transmit(datagram) => {
                    try_ready!(self.transport.poll_send(datagram));

                    self.state = State::AwaitAck;
                    continue;
                }
                State::AwaitAck => {
                    let event = try_ready!(self.transport.poll_recv());
                    let outcome = self.sender.handle(event);

                    self.sync_timeout();
                    outcome.map_err(|e| {
                        self.state = State::Done;
                        e
                    })?
                }
                State::Done => panic!(POLLED_AFTER_COMPLETION),
            };

            if let Some(stats) = self.enter(outcome) {
                return Ok(Async::Ready(stats));
            }
        }
    }
}
