//! Fault injection for exercising the protocol over a bad channel.
//!
//! [`Lossy`] wraps any transport and applies a random fault model to every
//! outgoing datagram:
//!
//! | Fault       | Description                                   |
//! |-------------|-----------------------------------------------|
//! | Loss        | Drop the datagram with `loss_rate`.           |
//! | Corruption  | Flip one random bit with `corrupt_rate`.      |
//! | Duplication | Send the datagram twice with `duplicate_rate`.|
//!
//! Receiving is passed through untouched, so wrapping both ends of a channel
//! covers both directions.

use crate::transport::{Received, Transport};
use bytes::Bytes;
use futures::prelude::*;
use log::trace;
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error,
    time::Duration,
};

/// Configuration for the fault model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaultConfig {
    /// Probability that a datagram is corrupted.
    pub corrupt_rate: f64,

    /// Probability that a datagram is sent twice.
    pub duplicate_rate: f64,

    /// Probability that a datagram is silently dropped.
    pub loss_rate: f64,

    /// Seed for reproducible runs. A random seed is used if unset.
    pub seed: Option<u64>,
}

/// The error when a fault probability lies outside of `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidRate {
    pub name: &'static str,
    pub value: f64,
}

/// A transport that randomly loses, corrupts and duplicates what it sends.
#[derive(Debug)]
pub struct Lossy<T> {
    config: FaultConfig,
    inner: T,

    /// The datagram currently being sent and the number of copies left.
    ///
    /// The fate of a datagram is decided once, even if the inner transport
    /// needs to be polled multiple times.
    outgoing: Option<(Bytes, usize)>,
    rng: StdRng,
}

impl FaultConfig {
    /// Checks that every rate is a valid probability.
    pub fn validate(&self) -> Result<(), InvalidRate> {
        let rates = [
            ("corrupt_rate", self.corrupt_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("loss_rate", self.loss_rate),
        ];

        match rates.iter().find(|(_, v)| !(*v >= 0.0 && *v <= 1.0)) {
            Some(&(name, value)) => Err(InvalidRate { name, value }),
            None => Ok(()),
        }
    }

    /// Whether the model never alters a datagram.
    pub fn is_transparent(&self) -> bool {
        self.corrupt_rate == 0.0 && self.duplicate_rate == 0.0 && self.loss_rate == 0.0
    }
}

impl<T: Transport> Lossy<T> {
    /// Wraps `inner` into the given fault model.
    pub fn new(inner: T, config: FaultConfig) -> Result<Self, InvalidRate> {
        config.validate()?;

        let mut seed = [0; 32];
        match config.seed {
            Some(s) => seed[..8].copy_from_slice(&s.to_le_bytes()),
            None => rand::thread_rng().fill_bytes(&mut seed),
        }

        Ok(Lossy {
            config,
            inner,
            outgoing: None,
            rng: StdRng::from_seed(seed),
        })
    }

    /// Gets a reference to the wrapped transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Gets the wrapped transport back out.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Decides what happens to a datagram about to be sent.
    ///
    /// Returns the bytes to put on the wire and how often, or `None` if the
    /// datagram is lost.
    fn apply_faults(&mut self, datagram: &[u8]) -> Option<(Bytes, usize)> {
        if self.rng.gen_bool(self.config.loss_rate) {
            trace!("dropping datagram of {} bytes", datagram.len());
            return None;
        }

        let mut buf = datagram.to_vec();
        if !buf.is_empty() && self.rng.gen_bool(self.config.corrupt_rate) {
            let byte = self.rng.gen_range(0, buf.len());
            let bit = self.rng.gen_range(0u32, 8);
            trace!("corrupting bit {} of byte {}", bit, byte);

            buf[byte] ^= 1 << bit;
        }

        let copies = if self.rng.gen_bool(self.config.duplicate_rate) {
            trace!("duplicating datagram of {} bytes", buf.len());
            2
        } else {
            1
        };

        Some((buf.into(), copies))
    }
}

impl<T: Transport> Transport for Lossy<T> {
    fn poll_send(&mut self, datagram: &[u8]) -> Poll<(), Error> {
        if self.outgoing.is_none() {
            match self.apply_faults(datagram) {
                Some(out) => self.outgoing = Some(out),
                None => return Ok(Async::Ready(())),
            }
        }

        while let Some((buf, copies)) = self.outgoing.take() {
            if let Async::NotReady = self.inner.poll_send(&buf)? {
                self.outgoing = Some((buf, copies));
                return Ok(Async::NotReady);
            }

            if copies > 1 {
                self.outgoing = Some((buf, copies - 1));
            }
        }

        Ok(Async::Ready(()))
    }

    fn poll_recv(&mut self) -> Poll<Received, Error> {
        self.inner.poll_recv()
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.inner.set_timeout(timeout);
    }
}

impl Display for InvalidRate {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(
            fmt,
            "{} must be a probability between 0 and 1, got {}",
            self.name, self.value,
        )
    }
}

impl StdError for InvalidRate {}
