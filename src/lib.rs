//! # rackwire
//!
//! Client for the fixed-frame TCP protocol of mobile-racking controllers:
//! - 4-byte commands: request status, open aisle 1..=19
//! - 20-byte status frames of ten little-endian words
//! - Strict request/response over a single connection
//! - Status word meaning supplied by a swappable [`FieldLayout`]
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Caller (CLI, dashboard)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ connect / request_status / open_aisle / close
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 MobileRackingSession                        │
//! │       (state guard, one outstanding request, deadline)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Protocol   │          │  TcpStream  │
//!   │   (codec)   │          │ (exclusive) │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! The library never logs; failures come back as [`RackError`] and the caller
//! decides on retries and reporting.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RackError, Result};
pub use config::Config;
pub use network::{MobileRackingSession, SessionState};
pub use protocol::{CommandFrame, Field, FieldLayout, StatusFrame};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rackwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
