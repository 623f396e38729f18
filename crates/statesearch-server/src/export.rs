//! Dumping feedback rows as JSON Lines for offline evaluation and training.

use std::io::Write;

use serde::Serialize;
use statesearch_core::{signal::Feedback, theorem::TheoremId};

use crate::error::Result;

#[derive(Serialize)]
struct FeedbackRecord<'a> {
  id:         i64,
  query:      &'a str,
  theorem_id: TheoremId,
  relevant:   bool,
  rank:       i64,
}

/// Write one JSON object per row to `writer`; returns the row count.
pub fn write_feedback(rows: &[Feedback], mut writer: impl Write) -> Result<usize> {
  for row in rows {
    let record = FeedbackRecord {
      id:         row.id,
      query:      &row.query,
      theorem_id: row.theorem_id,
      relevant:   row.relevant,
      rank:       row.rank,
    };
    serde_json::to_writer(&mut writer, &record)?;
    writer.write_all(b"\n")?;
  }
  writer.flush()?;
  Ok(rows.len())
}

#[cfg(test)]
mod tests {
  use serde_json::{Value, json};
  use statesearch_core::{signal::NewFeedback, store::FeedbackStore};
  use statesearch_store_sqlite::SqliteStore;

  use super::*;

  #[tokio::test]
  async fn every_row_becomes_one_line() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for (theorem_id, relevant) in [(1, true), (2, false)] {
      store
        .record_feedback(NewFeedback { query: "⊢ True".into(), theorem_id, relevant, rank: 0 })
        .await
        .unwrap();
    }
    let rows = store.list_feedback().await.unwrap();

    let mut out = Vec::new();
    let written = write_feedback(&rows, &mut out).unwrap();

    assert_eq!(written, 2);
    let lines: Vec<Value> = std::str::from_utf8(&out)
      .unwrap()
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(
      lines[0],
      json!({ "id": rows[0].id, "query": "⊢ True", "theorem_id": 1, "relevant": true, "rank": 0 })
    );
    assert_eq!(lines[1]["relevant"], false);
  }
}
