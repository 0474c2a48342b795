use thiserror::Error;

/// Failure to acquire or read from the camera. Always fatal to the scan
/// session that hit it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera permission denied")]
    PermissionDenied,
    #[error("No camera device found")]
    NoDevice,
    #[error("Camera is already in use by another scan session")]
    Busy,
    #[error("Camera failure: {0}")]
    Device(String),
}

/// A frame that did not yield a code. Expected on most frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("no code found in frame")]
    NoCode,
    #[error("corrupted image: {0}")]
    Corrupted(String),
    #[error("transient frame read error: {0}")]
    Read(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(#[from] CameraError),
    #[error("Scan session stopped before a code was decoded")]
    Stopped,
}

/// Rejections reported by the redemption service. The display text is what
/// ends up in a failed outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedemptionError {
    #[error("This QR code is not valid")]
    NotFound,
    #[error("This QR code has already been redeemed")]
    AlreadyRedeemed,
    #[error("This QR code has expired")]
    Expired,
    #[error("Redemption service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Payout {0} not found")]
    NotFound(String),
    #[error("Payout request rejected: {0}")]
    Rejected(String),
    #[error("Payout service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Status of payout {payout_id} could not be fetched after {failures} attempts: {last}")]
    TooManyFailures {
        payout_id: String,
        failures: u32,
        last: ServiceError,
    },
    #[error("Polling of payout {payout_id} stopped before a final status arrived")]
    Interrupted { payout_id: String },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
