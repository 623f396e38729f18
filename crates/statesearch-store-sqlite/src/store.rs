//! [`SqliteStore`], the SQLite implementation of the relational repository
//! traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use statesearch_core::{
  Revision,
  signal::{Call, Click, Feedback, NewCall, NewClick, NewFeedback},
  store::{ActivityStore, FeedbackStore, TheoremStore},
  theorem::{NewTheorem, Theorem, TheoremId},
};

use crate::{
  Result,
  encode::{
    FEEDBACK_COLUMNS, RawCall, RawClick, RawFeedback, RawTheorem, THEOREM_COLUMNS,
    encode_args, encode_dt,
  },
  schema::SCHEMA,
};

/// Upper bound on bound parameters per `IN (...)` lookup.
const ID_CHUNK: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A statesearch relational store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// are serialised on the connection's worker thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every click row, ordered by id.
  pub async fn list_clicks(&self) -> Result<Vec<Click>> {
    let raws: Vec<RawClick> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT id, query, theorem_id, rank, recorded_at FROM clicks ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawClick {
              id:          row.get(0)?,
              query:       row.get(1)?,
              theorem_id:  row.get(2)?,
              rank:        row.get(3)?,
              recorded_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClick::into_click).collect()
  }

  /// Every call row, ordered by id.
  pub async fn list_calls(&self) -> Result<Vec<Call>> {
    let raws: Vec<RawCall> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT id, call_type, query, recorded_at FROM calls ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCall {
              id:          row.get(0)?,
              call_type:   row.get(1)?,
              query:       row.get(2)?,
              recorded_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCall::into_call).collect()
  }
}

/// `true` if `err` is SQLite reporting a missing table.
fn is_missing_table(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table")
  )
}

impl SqliteStore {
  /// Insert `theorems` under `rev` in one transaction. With `replace`, the
  /// revision's existing rows are deleted inside the same transaction.
  async fn write_theorems(
    &self,
    rev: &Revision,
    theorems: Vec<NewTheorem>,
    replace: bool,
  ) -> Result<(usize, Vec<Theorem>)> {
    let rev_str = rev.as_str().to_owned();
    let rows = theorems
      .iter()
      .map(|t| {
        Ok((
          t.name.clone(),
          encode_args(&t.args)?,
          t.goal.clone(),
          t.module.clone(),
          t.formal_type.clone(),
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    let (removed, ids): (usize, Vec<i64>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let removed = if replace {
          tx.execute("DELETE FROM theorems WHERE rev = ?1", rusqlite::params![rev_str])?
        } else {
          0
        };
        let mut ids = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO theorems (name, args, goal, module, rev, formal_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (name, args, goal, module, formal_type) in &rows {
            stmt.execute(rusqlite::params![name, args, goal, module, rev_str, formal_type])?;
            ids.push(tx.last_insert_rowid());
          }
        }
        tx.commit()?;
        Ok((removed, ids))
      })
      .await?;

    Ok((
      removed,
      theorems
        .into_iter()
        .zip(ids)
        .map(|(t, id)| Theorem {
          id,
          name: t.name,
          args: t.args,
          goal: t.goal,
          module: t.module,
          rev: rev.clone(),
          formal_type: t.formal_type,
        })
        .collect(),
    ))
  }
}

// ─── TheoremStore impl ───────────────────────────────────────────────────────

impl TheoremStore for SqliteStore {
  type Error = crate::Error;

  async fn insert_theorems(
    &self,
    rev: &Revision,
    theorems: Vec<NewTheorem>,
  ) -> Result<Vec<Theorem>> {
    let (_, stored) = self.write_theorems(rev, theorems, false).await?;
    Ok(stored)
  }

  async fn replace_revision(
    &self,
    rev: &Revision,
    theorems: Vec<NewTheorem>,
  ) -> Result<(usize, Vec<Theorem>)> {
    self.write_theorems(rev, theorems, true).await
  }

  async fn theorems_in_revision(&self, rev: &Revision) -> Result<Vec<Theorem>> {
    let rev_str = rev.as_str().to_owned();

    let raws: Vec<RawTheorem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {THEOREM_COLUMNS} FROM theorems WHERE rev = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![rev_str], RawTheorem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTheorem::into_theorem).collect()
  }

  async fn theorems_by_ids(&self, ids: &[TheoremId]) -> Result<Vec<Theorem>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids = ids.to_vec();

    let raws: Vec<RawTheorem> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let mut stmt = conn.prepare(&format!(
            "SELECT {THEOREM_COLUMNS} FROM theorems WHERE id IN ({placeholders})"
          ))?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(chunk), RawTheorem::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found);
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTheorem::into_theorem).collect()
  }

  async fn delete_revision(&self, rev: &Revision) -> Result<usize> {
    let rev_str = rev.as_str().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM theorems WHERE rev = ?1",
          rusqlite::params![rev_str],
        )?)
      })
      .await?;

    Ok(removed)
  }

  async fn revisions(&self) -> Result<Vec<Revision>> {
    let tags: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = match conn.prepare("SELECT DISTINCT rev FROM theorems ORDER BY rev") {
          Ok(stmt) => stmt,
          Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
          Err(e) => return Err(e.into()),
        };
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      tags
        .into_iter()
        .filter_map(|tag| match Revision::parse(&tag) {
          Ok(rev) => Some(rev),
          Err(err) => {
            tracing::warn!(tag = %tag, error = %err, "skipping invalid revision tag");
            None
          }
        })
        .collect(),
    )
  }
}

// ─── FeedbackStore impl ──────────────────────────────────────────────────────

impl FeedbackStore for SqliteStore {
  type Error = crate::Error;

  async fn record_feedback(&self, input: NewFeedback) -> Result<Feedback> {
    let recorded_at = Utc::now();
    let at_str      = encode_dt(recorded_at);
    let query       = input.query.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feedback (query, theorem_id, relevant, rank, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![query, input.theorem_id, input.relevant, input.rank, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Feedback {
      id,
      query: input.query,
      theorem_id: input.theorem_id,
      relevant: input.relevant,
      rank: input.rank,
      recorded_at,
    })
  }

  async fn update_latest_feedback(&self, input: NewFeedback) -> Result<Option<Feedback>> {
    let recorded_at = Utc::now();
    let at_str      = encode_dt(recorded_at);
    let query       = input.query.clone();

    // Lookup and write share one transaction on the connection thread, so
    // two concurrent updates of the same pair cannot interleave.
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let id: Option<i64> = tx
          .query_row(
            "SELECT id FROM feedback
             WHERE query = ?1 AND theorem_id = ?2
             ORDER BY id DESC LIMIT 1",
            rusqlite::params![query, input.theorem_id],
            |row| row.get(0),
          )
          .optional()?;

        let Some(id) = id else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE feedback SET relevant = ?1, rank = ?2, recorded_at = ?3 WHERE id = ?4",
          rusqlite::params![input.relevant, input.rank, at_str, id],
        )?;
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(id.map(|id| Feedback {
      id,
      query: input.query,
      theorem_id: input.theorem_id,
      relevant: input.relevant,
      rank: input.rank,
      recorded_at,
    }))
  }

  async fn list_feedback(&self) -> Result<Vec<Feedback>> {
    let raws: Vec<RawFeedback> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {FEEDBACK_COLUMNS} FROM feedback ORDER BY id"))?;
        let rows = stmt
          .query_map([], RawFeedback::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedback::into_feedback).collect()
  }
}

// ─── ActivityStore impl ──────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  type Error = crate::Error;

  async fn record_click(&self, input: NewClick) -> Result<Click> {
    let recorded_at = Utc::now();
    let at_str      = encode_dt(recorded_at);
    let query       = input.query.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO clicks (query, theorem_id, rank, recorded_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![query, input.theorem_id, input.rank, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Click {
      id,
      query: input.query,
      theorem_id: input.theorem_id,
      rank: input.rank,
      recorded_at,
    })
  }

  async fn record_call(&self, input: NewCall) -> Result<Call> {
    let recorded_at = Utc::now();
    let at_str      = encode_dt(recorded_at);
    let call_type   = input.call_type.clone();
    let query       = input.query.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO calls (call_type, query, recorded_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![call_type, query, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Call { id, call_type: input.call_type, query: input.query, recorded_at })
  }
}
