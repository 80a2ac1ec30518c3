//! Terminal dashboard client for the Yumi Sugoi Discord bot.
//!
//! Maintains a live update channel to the bot's backend, normalizes
//! inbound push updates, and renders them to the terminal. Transient
//! disconnects are survived with bounded exponential backoff; once the
//! retry budget is exhausted the session degrades permanently to
//! periodic REST refreshes.

/// Live channel driver and caller handle.
pub mod channel;
/// Connection state machine and reconnect policy.
pub mod channel_state;
/// Command-line argument definitions.
pub mod cli;
/// Runtime configuration model.
pub mod config;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between channel and renderer.
pub mod events;
/// Terminal output formatters.
pub mod formatter;
/// Metrics setup and global counters.
pub mod monitoring;
/// REST refresh cycle (initial load and polling fallback).
pub mod poller;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Dashboard update and resource models.
pub mod types;
/// Renderer event loop.
pub mod ui;

/// Primary crate error type.
pub use error::DashboardError;
