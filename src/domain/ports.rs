use super::frame::RasterBuffer;
use super::outcome::{Amount, RedemptionOutcome, Reward};
use super::payout::PayoutRecord;
use super::token::CanonicalToken;
use crate::error::{CameraError, DetectError, RedemptionError, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which camera to ask for. Rear is preferred for scanning printed codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    Rear,
    Front,
}

impl FromStr for Facing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rear" | "back" | "environment" => Ok(Self::Rear),
            "front" | "user" => Ok(Self::Front),
            other => Err(format!("unknown camera facing '{other}'")),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rear => f.write_str("rear"),
            Self::Front => f.write_str("front"),
        }
    }
}

/// Grants exclusive camera streams.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn open(&self, facing: Facing) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// A live, exclusively owned camera stream.
pub trait CameraStream: Send {
    /// Whether a frame that has not been read yet is available.
    fn has_new_frame(&self) -> bool;

    /// Copies the current frame into `raster`, resizing it as needed.
    fn read_frame(&mut self, raster: &mut RasterBuffer) -> Result<(), DetectError>;

    /// Stops every track of the stream and gives the device back.
    fn stop(&mut self);
}

/// Finds a machine-readable code in a raster and returns its text.
pub trait CodeDetector: Send + Sync {
    fn detect(&self, raster: &RasterBuffer) -> Result<String, DetectError>;
}

/// The display's per-frame callback.
#[async_trait]
pub trait FrameClock: Send + Sync {
    /// Resolves when the next frame is due to be rendered.
    async fn next_frame(&self);
}

#[async_trait]
pub trait RedemptionService: Send + Sync {
    async fn submit_redemption(&self, token: &CanonicalToken) -> Result<Reward, RedemptionError>;
}

#[async_trait]
pub trait PayoutService: Send + Sync {
    async fn create_payout(&self, amount: Amount, method_id: &str)
    -> Result<PayoutRecord, ServiceError>;
    async fn get_payout(&self, id: &str) -> Result<PayoutRecord, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

/// Side channel for user-facing notices; rendering is someone else's job.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, title: &str, message: &str);
}

/// The route boundary.
pub trait Navigator: Send + Sync {
    /// Moves to the redeem route with the token as a path segment.
    fn to_redeem(&self, token: &CanonicalToken);

    /// Moves to the result view carrying the outcome as transient state.
    fn to_result(&self, outcome: RedemptionOutcome);
}

pub type CameraRef = Arc<dyn Camera>;
pub type CodeDetectorRef = Arc<dyn CodeDetector>;
pub type FrameClockRef = Arc<dyn FrameClock>;
pub type RedemptionServiceRef = Arc<dyn RedemptionService>;
pub type PayoutServiceRef = Arc<dyn PayoutService>;
pub type NotifierRef = Arc<dyn Notifier>;
pub type NavigatorRef = Arc<dyn Navigator>;
