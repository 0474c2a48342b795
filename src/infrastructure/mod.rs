//! Adapters behind the domain ports: scripted cameras, the display clock,
//! in-memory services and, with the `detector-rqrr` feature, a real QR
//! detector.

pub mod camera;
pub mod clock;
pub mod in_memory;
#[cfg(feature = "detector-rqrr")]
pub mod rqrr_detector;
