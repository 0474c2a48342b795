//! Application layer: the live capture loop, the redemption state machine
//! and the payout flow built on top of the status poller.
//!
//! Every long-running piece (a scan session, a polling session) is an owned
//! handle whose drop stops the underlying `tokio` task.

pub mod payout;
pub mod pipeline;
pub mod poller;
pub mod redemption;
pub mod scanner;
