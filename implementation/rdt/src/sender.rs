//! The stop-and-wait sender automaton.
//!
//! The [`Sender`] owns the outbound payload and the single segment in flight.
//! It never touches a socket: the caller feeds it whatever the channel
//! produced (a datagram or a timeout) and transmits what it returns.

use crate::{
    backoff::{Aborted, Backoff},
    config::Config,
    segment::{self, AckSegment, DataSegment},
    transport::Received,
};
use bytes::Bytes;
use log::{debug, trace};
use std::{cmp, time::Duration};

/// Stop-and-wait send-side state for one transfer.
#[derive(Debug)]
pub struct Sender {
    backoff: Backoff,
    max_segment_size: usize,

    /// The sequence number of the next segment to be built.
    ///
    /// Only advances when the pending segment is acknowledged.
    next_seq_no: u8,

    /// The segment awaiting acknowledgment, if any.
    pending: Option<Pending>,

    /// The part of the payload not yet put into a segment.
    remaining: Bytes,
    stats: SenderStats,
}

/// A segment that has been sent but not yet acknowledged.
#[derive(Clone, Debug, Eq, PartialEq)]
struct Pending {
    segment: DataSegment,

    /// The segment in serialized form, kept for retransmission.
    wire: Bytes,
}

/// What the caller needs to do next.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Outcome {
    /// Put the datagram on the wire and wait for the response.
    Transmit(Bytes),

    /// Every segment has been acknowledged.
    Complete,
}

/// The classification of a channel event while a segment is in flight.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verdict {
    /// The pending segment was acknowledged.
    Acked,

    /// The ACK refers to the segment before the pending one.
    Stale,

    /// The ACK refers to neither the pending nor the previous segment.
    OutOfWindow,

    /// The datagram failed the checksum or wasn't an ACK at all.
    Corrupt,

    /// Nothing arrived in time.
    TimedOut,
}

/// Counters describing the course of a transfer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SenderStats {
    pub bytes_acked: usize,
    pub corrupt_acks: usize,
    pub out_of_window_acks: usize,
    pub retransmissions: usize,
    pub segments_sent: usize,
    pub stale_acks: usize,
    pub timeouts: usize,
}

impl Sender {
    /// Creates a sender for `payload` with a random initial sequence number.
    pub fn new(payload: impl Into<Bytes>, config: &Config) -> Self {
        Self::with_initial_seq_no(payload, config, rand::random())
    }

    /// Creates a sender for `payload` starting from the given initial
    /// sequence number.
    ///
    /// The first segment is numbered `initial + max_segment_size`.
    pub fn with_initial_seq_no(
        payload: impl Into<Bytes>,
        config: &Config,
        initial: u8,
    ) -> Self {
        let mss = config.max_segment_size();

        Sender {
            backoff: Backoff::new(config),
            max_segment_size: mss,
            next_seq_no: segment::advance(initial, mss),
            pending: None,
            remaining: payload.into(),
            stats: SenderStats::default(),
        }
    }

    /// Produces the first segment, or `Complete` for an empty payload.
    ///
    /// If a segment is already in flight, it is returned again.
    pub fn start(&mut self) -> Outcome {
        match self.pending {
            Some(ref p) => Outcome::Transmit(p.wire.clone()),
            None => self.next_segment(),
        }
    }

    /// Processes an event from the channel.
    ///
    /// Fails if the retransmission timeout grew past its ceiling, after
    /// which the transfer must be abandoned.
    pub fn handle(&mut self, event: Received) -> Result<Outcome, Aborted> {
        let (seq_no, acked_len) = match self.pending {
            Some(ref p) => (p.segment.seq_no, p.segment.payload.len()),
            None => return Ok(Outcome::Complete),
        };

        match self.classify(&event) {
            Verdict::Acked => {
                debug!("segment {} acknowledged", seq_no);

                self.stats.bytes_acked += acked_len;
                self.backoff.on_progress();
                self.next_seq_no = segment::advance(seq_no, acked_len);
                self.pending = None;

                return Ok(self.next_segment());
            }
            Verdict::TimedOut => {
                trace!("timed out waiting for ACK of {}", seq_no);

                self.stats.timeouts += 1;
                self.backoff.on_failure()?;
            }
            Verdict::Corrupt => {
                trace!("received corrupt ACK while waiting for {}", seq_no);

                self.stats.corrupt_acks += 1;
                self.backoff.on_failure()?;
            }
            Verdict::Stale => {
                trace!("received stale ACK for {}", seq_no);
                self.stats.stale_acks += 1;
            }
            Verdict::OutOfWindow => {
                trace!("received out-of-window ACK while waiting for {}", seq_no);
                self.stats.out_of_window_acks += 1;
            }
        }

        Ok(self.retransmit())
    }

    /// Classifies an event with respect to the pending segment.
    ///
    /// Anything is `Corrupt` if there's no pending segment.
    pub fn classify(&self, event: &Received) -> Verdict {
        let datagram = match event {
            Received::Datagram(d) => d,
            Received::TimedOut => return Verdict::TimedOut,
        };
        let pending = match self.pending {
            Some(ref p) => &p.segment,
            None => return Verdict::Corrupt,
        };

        match AckSegment::read_from(datagram) {
            Ok(ack) if ack.ack_no == pending.seq_no => Verdict::Stale,
            Ok(ack) if ack.ack_no == pending.next_seq_no() => Verdict::Acked,
            Ok(_) => Verdict::OutOfWindow,
            Err(e) => {
                trace!("discarding ACK: {}", e);
                Verdict::Corrupt
            }
        }
    }

    /// Whether every segment has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.pending.is_none() && self.remaining.is_empty()
    }

    /// The sequence number of the segment in flight.
    pub fn pending_seq_no(&self) -> Option<u8> {
        self.pending.as_ref().map(|p| p.segment.seq_no)
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// The current retransmission timeout.
    ///
    /// This must be applied to the channel after every call to `handle`.
    pub fn timeout(&self) -> Duration {
        self.backoff.timeout()
    }

    /// Cuts the next chunk off the payload and puts it in flight.
    fn next_segment(&mut self) -> Outcome {
        if self.remaining.is_empty() {
            return Outcome::Complete;
        }

        let len = cmp::min(self.max_segment_size, self.remaining.len());
        let segment = DataSegment::new(self.next_seq_no, self.remaining.split_to(len));
        let wire = segment.to_bytes();

        debug!("sending segment {} with {} bytes", segment.seq_no, len);

        self.pending = Some(Pending {
            segment,
            wire: wire.clone(),
        });
        self.stats.segments_sent += 1;

        Outcome::Transmit(wire)
    }

    /// Sends the pending segment again, unchanged.
    fn retransmit(&mut self) -> Outcome {
        match self.pending {
            Some(ref p) => {
                self.stats.retransmissions += 1;
                Outcome::Transmit(p.wire.clone())
            }
            None => Outcome::Complete,
        }
    }
}
