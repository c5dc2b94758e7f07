//! Coursepay - payment verification and referral settlement for an online course marketplace
//!
//! This library provides the core functionality for the Coursepay service,
//! including database operations, Razorpay integration, referral reward
//! settlement, and API handlers.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod sweep;
