//! User signals recorded alongside searches: relevance feedback, result
//! clicks and call events.
//!
//! Feedback rows may be updated in place (see
//! [`crate::store::FeedbackStore::update_latest_feedback`]); clicks and calls
//! are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::theorem::TheoremId;

// ─── Feedback ────────────────────────────────────────────────────────────────

/// A relevance judgment for one theorem shown for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
  pub id:          i64,
  pub query:       String,
  pub theorem_id:  TheoremId,
  pub relevant:    bool,
  /// Position of the theorem in the result list when the judgment was made.
  pub rank:        i64,
  /// Server-assigned; refreshed when the row is updated.
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
  pub query:      String,
  pub theorem_id: TheoremId,
  pub relevant:   bool,
  pub rank:       i64,
}

// ─── Click ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Click {
  pub id:          i64,
  pub query:       String,
  pub theorem_id:  TheoremId,
  pub rank:        i64,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClick {
  pub query:      String,
  pub theorem_id: TheoremId,
  pub rank:       i64,
}

// ─── Call ────────────────────────────────────────────────────────────────────

/// A client-reported invocation event, e.g. a search issued from an editor
/// integration rather than the web UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
  pub id:          i64,
  pub call_type:   String,
  pub query:       String,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCall {
  pub call_type: String,
  pub query:     String,
}
