//! Protocol parameters.

use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};

/// The default maximum number of payload bytes in a single segment.
pub const MAX_SEGMENT_SIZE: usize = 250;

/// The default time to wait for a segment before retransmitting.
pub const INITIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// The default upper bound for the backed-off timeout.
///
/// Once the timeout grows beyond this the peer is considered unreachable.
pub const TIMEOUT_CEILING: Duration = Duration::from_secs(5);

/// The default number of consecutive failures before the timeout is doubled.
pub const RETRY_THRESHOLD: u32 = 3;

/// The default amount the timeout shrinks by after each successful exchange.
pub const RELAX_STEP: Duration = Duration::from_millis(100);

/// The largest segment size that still moves the sequence ring forward.
const SEGMENT_SIZE_LIMIT: usize = 255;

/// Parameters of a sender or receiver session.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    initial_timeout: Duration,
    max_segment_size: usize,
    relax_step: Duration,
    retry_threshold: u32,
    timeout_ceiling: Duration,
}

/// A builder for a `Config`.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ConfigBuilder {
    initial_timeout: Option<Duration>,
    max_segment_size: Option<usize>,
    relax_step: Option<Duration>,
    retry_threshold: Option<u32>,
    timeout_ceiling: Option<Duration>,
}

/// The error when a configuration is inconsistent.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ConfigError {
    /// The segment size is zero or too large for the sequence ring.
    SegmentSize(usize),

    /// The initial timeout is zero.
    ZeroTimeout,

    /// The ceiling lies below the initial timeout.
    CeilingBelowTimeout { ceiling: Duration, timeout: Duration },

    /// The retry threshold is zero.
    ZeroRetryThreshold,
}

impl Config {
    /// Creates a builder starting from the default values.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn initial_timeout(&self) -> Duration {
        self.initial_timeout
    }

    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }

    pub fn relax_step(&self) -> Duration {
        self.relax_step
    }

    pub fn retry_threshold(&self) -> u32 {
        self.retry_threshold
    }

    pub fn timeout_ceiling(&self) -> Duration {
        self.timeout_ceiling
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            initial_timeout: INITIAL_TIMEOUT,
            max_segment_size: MAX_SEGMENT_SIZE,
            relax_step: RELAX_STEP,
            retry_threshold: RETRY_THRESHOLD,
            timeout_ceiling: TIMEOUT_CEILING,
        }
    }
}

impl ConfigBuilder {
    /// Constructs a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the settings and builds the final config.
    ///
    /// Unset values fall back to the crate-level defaults.
    pub fn build(self) -> Result<Config, ConfigError> {
        let defaults = Config::default();
        let config = Config {
            initial_timeout: self.initial_timeout.unwrap_or(defaults.initial_timeout),
            max_segment_size: self.max_segment_size.unwrap_or(defaults.max_segment_size),
            relax_step: self.relax_step.unwrap_or(defaults.relax_step),
            retry_threshold: self.retry_threshold.unwrap_or(defaults.retry_threshold),
            timeout_ceiling: self.timeout_ceiling.unwrap_or(defaults.timeout_ceiling),
        };

        if config.max_segment_size == 0 || config.max_segment_size > SEGMENT_SIZE_LIMIT {
            return Err(ConfigError::SegmentSize(config.max_segment_size));
        }
        if config.initial_timeout == Duration::from_secs(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        if config.timeout_ceiling < config.initial_timeout {
            return Err(ConfigError::CeilingBelowTimeout {
                ceiling: config.timeout_ceiling,
                timeout: config.initial_timeout,
            });
        }
        if config.retry_threshold == 0 {
            return Err(ConfigError::ZeroRetryThreshold);
        }

        Ok(config)
    }

    /// Sets the timeout a session starts with. This is also the floor the
    /// timeout relaxes back to.
    pub fn initial_timeout(mut self, timeout: Duration) -> Self {
        self.initial_timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of payload bytes per segment.
    pub fn max_segment_size(mut self, size: usize) -> Self {
        self.max_segment_size = Some(size);
        self
    }

    /// Sets how much the timeout shrinks after a successful exchange.
    pub fn relax_step(mut self, step: Duration) -> Self {
        self.relax_step = Some(step);
        self
    }

    /// Sets the number of consecutive failures that double the timeout.
    pub fn retry_threshold(mut self, threshold: u32) -> Self {
        self.retry_threshold = Some(threshold);
        self
    }

    /// Sets the timeout beyond which a session is aborted.
    pub fn timeout_ceiling(mut self, ceiling: Duration) -> Self {
        self.timeout_ceiling = Some(ceiling);
        self
    }
}

impl Display for ConfigError {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        match self {
            ConfigError::SegmentSize(size) => write!(
                fmt,
                "segment size must be between 1 and {}, got {}",
                SEGMENT_SIZE_LIMIT, size,
            ),
            ConfigError::ZeroTimeout => "initial timeout must not be zero".fmt(fmt),
            ConfigError::CeilingBelowTimeout { ceiling, timeout } => write!(
                fmt,
                "timeout ceiling {:?} lies below the initial timeout {:?}",
                ceiling, timeout,
            ),
            ConfigError::ZeroRetryThreshold => "retry threshold must not be zero".fmt(fmt),
        }
    }
}

impl StdError for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::builder().build().unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.max_segment_size(), 250);
        assert_eq!(config.initial_timeout(), Duration::from_millis(100));
        assert_eq!(config.timeout_ceiling(), Duration::from_secs(5));
        assert_eq!(config.retry_threshold(), 3);
    }

    #[test]
    fn overrides() {
        let config = Config::builder()
            .max_segment_size(16)
            .initial_timeout(Duration::from_millis(5))
            .timeout_ceiling(Duration::from_millis(40))
            .build()
            .unwrap();

        assert_eq!(config.max_segment_size(), 16);
        assert_eq!(config.initial_timeout(), Duration::from_millis(5));
        assert_eq!(config.timeout_ceiling(), Duration::from_millis(40));
        assert_eq!(config.relax_step(), RELAX_STEP);
    }

    #[test]
    fn segment_size_bounds() {
        assert_eq!(
            Config::builder().max_segment_size(0).build(),
            Err(ConfigError::SegmentSize(0)),
        );
        assert_eq!(
            Config::builder().max_segment_size(256).build(),
            Err(ConfigError::SegmentSize(256)),
        );
        assert!(Config::builder().max_segment_size(255).build().is_ok());
    }

    #[test]
    fn ceiling_below_timeout() {
        let res = Config::builder()
            .initial_timeout(Duration::from_secs(2))
            .timeout_ceiling(Duration::from_secs(1))
            .build();

        match res {
            Err(ConfigError::CeilingBelowTimeout { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn zero_values() {
        assert_eq!(
            Config::builder().initial_timeout(Duration::from_secs(0)).build(),
            Err(ConfigError::ZeroTimeout),
        );
        assert_eq!(
            Config::builder().retry_threshold(0).build(),
            Err(ConfigError::ZeroRetryThreshold),
        );
    }
}
