use crate::domain::ports::Facing;
use crate::error::{PipelineError, Result};
use clap::Args;
use std::time::Duration;

pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Tunables of the capture loop and the payout poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Camera to request when a scan session starts.
    pub facing: Facing,
    /// Rate of the default display clock, in frames per second.
    pub frame_rate: u32,
    /// Delay between two payout status fetches.
    pub poll_interval: Duration,
    /// Consecutive fetch failures after which polling gives up. `None` retries
    /// until a terminal status arrives or the session is cancelled.
    pub max_consecutive_poll_errors: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            facing: Facing::Rear,
            frame_rate: DEFAULT_FRAME_RATE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_consecutive_poll_errors: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(self) -> Result<Self> {
        if self.frame_rate == 0 || self.frame_rate > 240 {
            return Err(PipelineError::ValidationError(format!(
                "frame rate must be between 1 and 240, got {}",
                self.frame_rate
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(PipelineError::ValidationError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_consecutive_poll_errors == Some(0) {
            return Err(PipelineError::ValidationError(
                "max consecutive poll errors must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// Command-line and environment overrides for [`PipelineConfig`].
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Camera to use: rear or front
    #[arg(long, env = "SCAN2REDEEM_FACING", default_value = "rear")]
    pub facing: Facing,

    /// Frames per second of the display clock
    #[arg(long, env = "SCAN2REDEEM_FRAME_RATE", default_value_t = DEFAULT_FRAME_RATE)]
    pub frame_rate: u32,

    /// Milliseconds between payout status fetches
    #[arg(long, env = "SCAN2REDEEM_POLL_INTERVAL_MS", default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// Give up polling after this many consecutive fetch failures
    #[arg(long, env = "SCAN2REDEEM_MAX_POLL_ERRORS")]
    pub max_poll_errors: Option<u32>,
}

impl TryFrom<ConfigArgs> for PipelineConfig {
    type Error = PipelineError;

    fn try_from(args: ConfigArgs) -> Result<Self> {
        PipelineConfig {
            facing: args.facing,
            frame_rate: args.frame_rate,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            max_consecutive_poll_errors: args.max_poll_errors,
        }
        .validate()
    }
}
