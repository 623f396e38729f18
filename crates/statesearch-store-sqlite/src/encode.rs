//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Theorem arguments are stored as
//! a compact JSON array. Revision tags are re-validated on the way out.

use chrono::{DateTime, Utc};
use statesearch_core::{
  Revision,
  signal::{Call, Click, Feedback},
  theorem::Theorem,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Args ────────────────────────────────────────────────────────────────────

pub fn encode_args(args: &[String]) -> Result<String> {
  Ok(serde_json::to_string(args)?)
}

pub fn decode_args(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawTheorem::from_row`].
pub const THEOREM_COLUMNS: &str = "id, name, args, goal, module, rev, formal_type";

/// Raw values read directly from a `theorems` row.
pub struct RawTheorem {
  pub id:          i64,
  pub name:        String,
  pub args:        String,
  pub goal:        String,
  pub module:      String,
  pub rev:         String,
  pub formal_type: Option<String>,
}

impl RawTheorem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      args:        row.get(2)?,
      goal:        row.get(3)?,
      module:      row.get(4)?,
      rev:         row.get(5)?,
      formal_type: row.get(6)?,
    })
  }

  pub fn into_theorem(self) -> Result<Theorem> {
    Ok(Theorem {
      id:          self.id,
      name:        self.name,
      args:        decode_args(&self.args)?,
      goal:        self.goal,
      module:      self.module,
      rev:         Revision::parse(self.rev)?,
      formal_type: self.formal_type,
    })
  }
}

/// Column list matching [`RawFeedback::from_row`].
pub const FEEDBACK_COLUMNS: &str = "id, query, theorem_id, relevant, rank, recorded_at";

/// Raw values read directly from a `feedback` row.
pub struct RawFeedback {
  pub id:          i64,
  pub query:       String,
  pub theorem_id:  i64,
  pub relevant:    bool,
  pub rank:        i64,
  pub recorded_at: String,
}

impl RawFeedback {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      query:       row.get(1)?,
      theorem_id:  row.get(2)?,
      relevant:    row.get(3)?,
      rank:        row.get(4)?,
      recorded_at: row.get(5)?,
    })
  }

  pub fn into_feedback(self) -> Result<Feedback> {
    Ok(Feedback {
      id:          self.id,
      query:       self.query,
      theorem_id:  self.theorem_id,
      relevant:    self.relevant,
      rank:        self.rank,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `clicks` row.
pub struct RawClick {
  pub id:          i64,
  pub query:       String,
  pub theorem_id:  i64,
  pub rank:        i64,
  pub recorded_at: String,
}

impl RawClick {
  pub fn into_click(self) -> Result<Click> {
    Ok(Click {
      id:          self.id,
      query:       self.query,
      theorem_id:  self.theorem_id,
      rank:        self.rank,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `calls` row.
pub struct RawCall {
  pub id:          i64,
  pub call_type:   String,
  pub query:       String,
  pub recorded_at: String,
}

impl RawCall {
  pub fn into_call(self) -> Result<Call> {
    Ok(Call {
      id:          self.id,
      call_type:   self.call_type,
      query:       self.query,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
