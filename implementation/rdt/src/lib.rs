//! Stop-and-wait reliable data transfer over an unreliable datagram channel.
//!
//! A [`Sender`] splits a byte stream into segments of bounded size and hands
//! them to the channel one at a time, retransmitting until each one is
//! acknowledged. A [`Receiver`] reassembles the stream, suppresses duplicates
//! and answers every segment with an acknowledgment. Both state machines are
//! free of I/O; the [`Transfer`] and [`Receive`] futures drive them over any
//! [`Transport`].

// Macros need to lexically come before the rest to be usable
#[macro_use] mod macros;

mod backoff;
mod config;
mod lossy;
pub mod memory;
mod receive;
mod receiver;
pub mod segment;
mod sender;
mod transfer;
mod transport;
mod udp;

pub use crate::backoff::{Aborted, Backoff};
pub use crate::config::{
    Config, ConfigBuilder, ConfigError, INITIAL_TIMEOUT, MAX_SEGMENT_SIZE,
    RELAX_STEP, RETRY_THRESHOLD, TIMEOUT_CEILING,
};
pub use crate::lossy::{FaultConfig, InvalidRate, Lossy};
pub use crate::receive::Receive;
pub use crate::receiver::{
    Reaction, Receiver, ReceiverStats, State as ReceiverState,
    Verdict as ReceiverVerdict,
};
pub use crate::sender::{
    Outcome, Sender, SenderStats, Verdict as SenderVerdict,
};
pub use crate::transfer::Transfer;
pub use crate::transport::{Received, RecvTimer, Transport};
pub use crate::udp::UdpTransport;

use bytes::Bytes;
use std::io::Write;

/// Transfers `payload` to the peer behind `transport`.
///
/// The returned future resolves once every segment has been acknowledged.
pub fn send<T: Transport>(
    transport: T,
    payload: impl Into<Bytes>,
    config: Config,
) -> Transfer<T> {
    Transfer::new(transport, payload.into(), config)
}

/// Receives a transfer from the peer behind `transport` and writes the
/// reassembled stream into `sink`.
///
/// The returned future only ever resolves with an error, either because the
/// peer stayed silent for too long or because of an I/O failure.
pub fn receive<T: Transport, W: Write>(
    transport: T,
    sink: W,
    config: Config,
) -> Receive<T, W> {
    Receive::new(transport, sink, config)
}

/// Some useful extensions to `Result`.
trait ResultExt<T, E> {
    /// Allows mutable transformation on the value, without requiring the value
    /// to be returned.
    ///
    /// This is a shorthand for:
    ///
    /// ```rust
    /// # let result: Result<usize, ()> = Ok(5);
    /// # fn configure(v: &mut usize) -> Result<(), ()> { *v += 1; Ok(()) }
    ///
    /// result.and_then(|mut v| {
    ///     configure(&mut v)?;
    ///     Ok(v)
    /// });
    /// ```
    fn inspect_mut(self, f: impl FnOnce(&mut T) -> Result<(), E>) -> Result<T, E>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn inspect_mut(self, f: impl FnOnce(&mut T) -> Result<(), E>) -> Self {
        self.and_then(|mut val| {
            f(&mut val)?;
            Ok(val)
        })
    }
}
