//! coursepay - course purchases reconciled against payment gateway webhooks
//!
//! Buyers open a checkout through the gateway, the attempt is recorded as a
//! pending payment, and gateway webhooks settle it: confirmed funds grant the
//! course and send a one-time welcome, failed transfers clean up.

pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod util;
