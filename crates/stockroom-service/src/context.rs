//! Request context carrying the authenticated actor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::types::id::UserId;

/// Context for the current authenticated request.
///
/// Constructed by the transport layer after authentication succeeds and
/// passed into service methods so that every operation knows *who* is
/// acting. An unauthenticated caller never reaches a service: the
/// transport reports that failure distinctly from an authorization
/// failure raised here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// The username (convenience field for logging).
    pub username: String,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            request_time: Utc::now(),
        }
    }
}
