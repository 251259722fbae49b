//! Promo campaign distribution service.
//!
//! The interesting part lives in [`workflows::promo`]: the activation engine
//! deciding, for a user and a campaign, whether redemption is allowed,
//! consuming one redemption unit atomically, and handing back the code.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
