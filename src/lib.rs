//! Bilibili Daily Task Runtime
//!
//! Runs a fixed daily batch of chores for each configured account over
//! one shared authenticated session, then pushes a level-progress summary.

pub mod aggregate;
pub mod config;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod setup;
pub mod tasks;
pub mod types;
