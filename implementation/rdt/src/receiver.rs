//! The stop-and-wait receiver automaton.

use crate::{
    backoff::{Aborted, Backoff},
    config::Config,
    segment::{AckSegment, DataSegment},
    transport::Received,
};
use bytes::Bytes;
use log::{debug, trace};
use std::time::Duration;

/// Receive-side state for one transfer.
///
/// The receiver accepts a segment as new if it carries the sequence number
/// following the last accepted one. Anything else that passes the checksum
/// is a retransmission of data we already have, which means our ACK got lost
/// and is sent again.
#[derive(Debug)]
pub struct Receiver {
    backoff: Backoff,

    /// The most recently sent ACK, in serialized form.
    last_ack: Option<Bytes>,
    state: State,
    stats: ReceiverStats,
}

/// States of the receiving automaton.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum State {
    /// No segment has been accepted yet. The first valid segment is taken
    /// regardless of its sequence number.
    AwaitingFirstSegment,

    /// Waiting for the segment numbered `expected`.
    AwaitingNextSegment { expected: u8 },
}

/// The classification of a channel event.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verdict {
    /// The segment carries data not seen before.
    New,

    /// The segment repeats data that was already accepted.
    Duplicate,

    /// The datagram failed the checksum or wasn't a data segment.
    Corrupt,

    /// Nothing arrived in time.
    TimedOut,
}

/// What the caller needs to do in response to an event.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Reaction {
    /// Payload to append to the output stream.
    pub deliver: Option<Bytes>,

    /// An ACK to put on the wire.
    pub reply: Option<Bytes>,
}

/// Counters describing the course of a transfer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ReceiverStats {
    pub ack_replays: usize,
    pub bytes_delivered: usize,
    pub corrupt: usize,
    pub duplicates: usize,
    pub segments_accepted: usize,
    pub timeouts: usize,
}

impl Receiver {
    pub fn new(config: &Config) -> Self {
        Receiver {
            backoff: Backoff::new(config),
            last_ack: None,
            state: State::AwaitingFirstSegment,
            stats: ReceiverStats::default(),
        }
    }

    /// Processes an event from the channel.
    ///
    /// Fails if the idle timeout grew past its ceiling because the sender
    /// stayed silent.
    ///
    /// On a timeout the backoff policy is applied before the cached ACK is
    /// replayed, so the timeout that aborts the session replays nothing.
    pub fn handle(&mut self, event: Received) -> Result<Reaction, Aborted> {
        let datagram = match event {
            Received::Datagram(d) => d,
            Received::TimedOut => {
                self.stats.timeouts += 1;
                self.backoff.on_failure()?;

                // Assume our last ACK was lost rather than the sender being done
                if self.last_ack.is_some() {
                    trace!("idle timeout, replaying last ACK");
                    self.stats.ack_replays += 1;
                }
                return Ok(Reaction {
                    deliver: None,
                    reply: self.last_ack.clone(),
                });
            }
        };

        let segment = match DataSegment::read_from(&datagram) {
            Ok(s) => s,
            Err(e) => {
                trace!("discarding segment: {}", e);
                self.stats.corrupt += 1;
                return Ok(Reaction::default());
            }
        };

        self.backoff.on_progress();

        let is_new = match self.state {
            State::AwaitingFirstSegment => true,
            State::AwaitingNextSegment { expected } => segment.seq_no == expected,
        };
        if !is_new {
            trace!("received duplicate of segment {}", segment.seq_no);
            self.stats.duplicates += 1;
            self.stats.ack_replays += 1;

            return Ok(Reaction {
                deliver: None,
                reply: self.last_ack.clone(),
            });
        }

        let expected = segment.next_seq_no();
        let ack = AckSegment::new(expected).to_bytes();

        debug!(
            "accepted segment {} with {} bytes",
            segment.seq_no,
            segment.payload.len(),
        );

        self.state = State::AwaitingNextSegment { expected };
        self.last_ack = Some(ack.clone());
        self.stats.segments_accepted += 1;
        self.stats.bytes_delivered += segment.payload.len();

        Ok(Reaction {
            deliver: Some(segment.payload),
            reply: Some(ack),
        })
    }

    /// Classifies an event without changing any state.
    pub fn classify(&self, event: &Received) -> Verdict {
        let datagram = match event {
            Received::Datagram(d) => d,
            Received::TimedOut => return Verdict::TimedOut,
        };

        match (DataSegment::read_from(datagram), self.state) {
            (Err(_), _) => Verdict::Corrupt,
            (Ok(_), State::AwaitingFirstSegment) => Verdict::New,
            (Ok(ref s), State::AwaitingNextSegment { expected }) if s.seq_no == expected => {
                Verdict::New
            }
            (Ok(_), State::AwaitingNextSegment { .. }) => Verdict::Duplicate,
        }
    }

    /// The cached ACK that is replayed on duplicates and timeouts.
    pub fn last_ack(&self) -> Option<&Bytes> {
        self.last_ack.as_ref()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// The current idle timeout.
    ///
    /// This must be applied to the channel after every call to `handle`.
    pub fn timeout(&self) -> Duration {
        self.backoff.timeout()
    }
}
