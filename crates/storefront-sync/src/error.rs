//! # Sync Error Types
//!
//! Error types for the realtime feed.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Transport     │  │    Protocol     │  │     Intake              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  WebSocketError │  │  InvalidMessage │  │  Storage (DbError)      │ │
//! │  │  ChannelError   │  │  Serialization  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_db::DbError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the hub, the socket handler and the intake task.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// WebSocket send or receive failed.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// An internal channel was closed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// A frame could not be decoded as a push event.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// An outbound event could not be encoded.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Intake Errors
    // =========================================================================
    /// The catalog rejected or failed to store a submission.
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl SyncError {
    /// True when the submitter sent something the catalog rules reject.
    pub fn is_rejection(&self) -> bool {
        match self {
            SyncError::Storage(db) => db.is_validation(),
            SyncError::InvalidMessage(_) => true,
            _ => false,
        }
    }
}
