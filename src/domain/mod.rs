//! Domain layer: value types of the scan-to-redeem pipeline and the ports
//! through which it talks to cameras, detectors and remote services.

pub mod frame;
pub mod outcome;
pub mod payout;
pub mod ports;
pub mod token;
