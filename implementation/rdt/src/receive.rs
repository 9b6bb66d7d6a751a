//! Implements the future that receives a transfer from the peer.

use crate::{
    config::Config,
    receiver::{Receiver, ReceiverStats},
    transport::Transport,
};
use bytes::Bytes;
use futures::{prelude::*, try_ready};
use log::debug;
use std::{
    io::{Error, Write},
    time::Duration,
};

/// A future representing the receiving side of a transfer.
///
/// Every newly accepted payload is written and flushed into the sink before
/// its ACK is put on the wire. The future never resolves successfully: it
/// runs until the sender stays silent past the timeout ceiling or an I/O
/// error occurs.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Receive<T, W> {
    receiver: Receiver,
    sink: W,
    state: State,

    /// The timeout last applied to the transport.
    timeout: Duration,
    transport: T,
}

/// The internal state of the receive future automaton.
#[derive(Debug)]
enum State {
    /// Waiting for the next segment.
    Listen,

    /// An ACK needs to be put onto the wire.
    Reply(Bytes),
}

impl<T: Transport, W: Write> Receive<T, W> {
    /// Creates a receiving loop over `transport` writing into `sink`.
    pub fn new(mut transport: T, sink: W, config: Config) -> Self {
        let receiver = Receiver::new(&config);
        let timeout = receiver.timeout();
        transport.set_timeout(timeout);

        Receive {
            receiver,
            sink,
            state: State::Listen,
            timeout,
            transport,
        }
    }

    /// Gets a reference to the receiver automaton.
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Gets a reference to the output sink.
    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    /// Pushes a changed idle timeout down to the transport.
    fn sync_timeout(&mut self) {
        let timeout = self.receiver.timeout();
        if timeout != self.timeout {
            self.transport.set_timeout(timeout);
            self.timeout = timeout;
        }
    }
}

impl<T: Transport, W: Write> Future for Receive<T, W> {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        loop {
            match &mut self.state {
                State::Reply(ack) => {
                    try_ready!(self.transport.poll_send(ack));
                    self.state = State::Listen;
                }
                State::Listen => {
                    let event = try_ready!(self.transport.poll_recv());
                    let reaction = self.receiver.handle(event);

                    self.sync_timeout();
                    let reaction = reaction.map_err(|e| {
                        debug!("giving up: {:?}", self.receiver.stats());
                        e
                    })?;

                    if let Some(payload) = reaction.deliver {
                        self.sink.write_all(&payload)?;
                        self.sink.flush()?;
                    }
                    if let Some(ack) = reaction.reply {
                        self.state = State::Reply(ack);
                    }
                }
            }
        }
    }
}
