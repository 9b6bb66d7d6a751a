//! The retry / backoff policy shared by both roles.

use crate::config::Config;
use log::warn;
use std::{
    cmp,
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    io,
    time::Duration,
};

/// Tracks consecutive failures and the current retransmission timeout.
///
/// Every `retry_threshold` failures the timeout doubles. Once it grows past
/// the ceiling the session is aborted. Progress resets the failure count and
/// relaxes the timeout back toward its initial value.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Backoff {
    ceiling: Duration,
    floor: Duration,
    relax_step: Duration,
    retries: u32,
    threshold: u32,
    timeout: Duration,
}

/// The error when the backed-off timeout exceeds its ceiling.
///
/// This signals that the peer is unreachable or the channel is permanently
/// broken. `timeout` is the value that exceeded the ceiling, or the last
/// representable one if doubling it overflowed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Aborted {
    pub ceiling: Duration,
    pub timeout: Duration,
}

impl Backoff {
    pub fn new(config: &Config) -> Self {
        Backoff {
            ceiling: config.timeout_ceiling(),
            floor: config.initial_timeout(),
            relax_step: config.relax_step(),
            retries: 0,
            threshold: config.retry_threshold(),
            timeout: config.initial_timeout(),
        }
    }

    /// The number of failures since the last progress or backoff step.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The current timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records a failed exchange.
    pub fn on_failure(&mut self) -> Result<(), Aborted> {
        self.retries += 1;
        if self.retries < self.threshold {
            return Ok(());
        }

        self.retries = 0;
        self.timeout = match self.timeout.checked_mul(2) {
            Some(timeout) => timeout,

            // Doubled past what a `Duration` can hold, so past any ceiling
            None => {
                return Err(Aborted {
                    ceiling: self.ceiling,
                    timeout: self.timeout,
                });
            }
        };

        if self.timeout > self.ceiling {
            return Err(Aborted {
                ceiling: self.ceiling,
                timeout: self.timeout,
            });
        }

        warn!("backing off, timeout is now {:?}", self.timeout);
        Ok(())
    }

    /// Records a successful exchange.
    pub fn on_progress(&mut self) {
        self.retries = 0;
        self.timeout = cmp::max(
            self.floor,
            self.timeout.checked_sub(self.relax_step).unwrap_or(self.floor),
        );
    }
}

impl Display for Aborted {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(
            fmt,
            "peer unreachable: backed off past the ceiling of {:?} at {:?}",
            self.ceiling, self.timeout,
        )
    }
}

impl StdError for Aborted {}

impl From<Aborted> for io::Error {
    fn from(err: Aborted) -> Self {
        io::Error::new(io::ErrorKind::TimedOut, err)
    }
}
