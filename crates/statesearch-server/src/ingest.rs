//! Loading theorem rows from JSON Lines.
//!
//! One object per line:
//!
//! ```json
//! {"full_name": "Nat.add_comm", "args": ["(n m : ℕ)"], "goal": "n + m = m + n", "mod_name": "Init.Data.Nat.Basic"}
//! ```
//!
//! `formal_type` is optional. Blank lines are skipped.

use std::io::BufRead;

use serde::Deserialize;
use statesearch_core::{Revision, store::TheoremStore, theorem::NewTheorem};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct TheoremRecord {
  full_name:   String,
  args:        Vec<String>,
  goal:        String,
  mod_name:    String,
  #[serde(default)]
  formal_type: Option<String>,
}

impl From<TheoremRecord> for NewTheorem {
  fn from(record: TheoremRecord) -> Self {
    NewTheorem {
      name:        record.full_name,
      args:        record.args,
      goal:        record.goal,
      module:      record.mod_name,
      formal_type: record.formal_type,
    }
  }
}

/// Parse every theorem in `reader`. Errors name the 1-based line.
pub fn read_theorems(reader: impl BufRead) -> Result<Vec<NewTheorem>> {
  let mut theorems = Vec::new();
  for (index, line) in reader.lines().enumerate() {
    let line = line?;
    if line.trim().is_empty() {
      continue;
    }
    let record: TheoremRecord =
      serde_json::from_str(&line).map_err(|source| Error::Parse { line: index + 1, source })?;
    theorems.push(record.into());
  }
  Ok(theorems)
}

/// Store `theorems` under `rev`. With `replace`, the revision's existing
/// rows are swapped out in the same transaction, so a failed load leaves
/// them untouched. Returns the number of rows inserted.
pub async fn load<S: TheoremStore>(
  store: &S,
  rev: &Revision,
  theorems: Vec<NewTheorem>,
  replace: bool,
) -> Result<usize> {
  let stored = if replace {
    let (removed, stored) = store
      .replace_revision(rev, theorems)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    tracing::info!(rev = %rev, removed, "cleared revision");
    stored
  } else {
    store
      .insert_theorems(rev, theorems)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
  };
  Ok(stored.len())
}

#[cfg(test)]
mod tests {
  use statesearch_store_sqlite::SqliteStore;

  use super::*;

  const SAMPLE: &str = r#"{"full_name": "Nat.add_comm", "args": ["(n m : ℕ)"], "goal": "n + m = m + n", "mod_name": "Init.Data.Nat.Basic"}

{"full_name": "Nat.le_refl", "args": [], "goal": "∀ n, n ≤ n", "mod_name": "Init.Prelude", "formal_type": "theorem"}
"#;

  #[test]
  fn records_map_onto_theorems() {
    let theorems = read_theorems(SAMPLE.as_bytes()).unwrap();
    assert_eq!(theorems.len(), 2);
    assert_eq!(theorems[0].name, "Nat.add_comm");
    assert_eq!(theorems[0].module, "Init.Data.Nat.Basic");
    assert_eq!(theorems[0].args, vec!["(n m : ℕ)".to_string()]);
    assert_eq!(theorems[1].formal_type.as_deref(), Some("theorem"));
  }

  #[test]
  fn bad_line_is_reported_by_number() {
    let input = "{\"full_name\": \"A\", \"args\": [], \"goal\": \"True\", \"mod_name\": \"M\"}\n{oops}\n";
    let err = read_theorems(input.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::Parse { line: 2, .. }));
  }

  #[tokio::test]
  async fn replace_clears_the_revision_first() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let rev = Revision::parse("v1").unwrap();

    load(&store, &rev, read_theorems(SAMPLE.as_bytes()).unwrap(), false).await.unwrap();
    load(&store, &rev, read_theorems(SAMPLE.as_bytes()).unwrap(), false).await.unwrap();
    assert_eq!(store.theorems_in_revision(&rev).await.unwrap().len(), 4);

    let inserted = load(&store, &rev, read_theorems(SAMPLE.as_bytes()).unwrap(), true)
      .await
      .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(store.theorems_in_revision(&rev).await.unwrap().len(), 2);
  }
}
