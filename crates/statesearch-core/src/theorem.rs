//! Theorem rows: the relational half of the corpus.
//!
//! A theorem's `id` is assigned by the relational store and is the join key
//! with the vector store: every vector-store point for a revision carries the
//! id of exactly one theorem row of that revision in its payload.

use serde::{Deserialize, Serialize};

use crate::revision::Revision;

/// Store-assigned theorem identifier.
pub type TheoremId = i64;

/// A named formal declaration belonging to one corpus revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theorem {
  pub id:          TheoremId,
  /// Fully-qualified declaration name.
  pub name:        String,
  /// Argument / hypothesis declarations, in declaration order.
  pub args:        Vec<String>,
  /// The conclusion type, pretty-printed.
  pub goal:        String,
  /// Source module path.
  pub module:      String,
  pub rev:         Revision,
  pub formal_type: Option<String>,
}

impl Theorem {
  /// Display form shown to users: `theorem <name> <args> : <goal>`.
  ///
  /// Arguments are concatenated without a separator; stored arguments carry
  /// their own binder brackets and spacing.
  pub fn code(&self) -> String {
    format!("theorem {} {} : {}", self.name, self.args.concat(), self.goal)
  }
}

/// Input to [`crate::store::TheoremStore::insert_theorems`]. The id and
/// revision are supplied by the store call, not by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTheorem {
  pub name:        String,
  pub args:        Vec<String>,
  pub goal:        String,
  pub module:      String,
  #[serde(default)]
  pub formal_type: Option<String>,
}

/// One ranked search result as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoremResult {
  pub id:          TheoremId,
  pub name:        String,
  pub code:        String,
  pub rev:         Revision,
  pub module:      String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub formal_type: Option<String>,
}

impl From<Theorem> for TheoremResult {
  fn from(theorem: Theorem) -> Self {
    let code = theorem.code();
    Self {
      id: theorem.id,
      name: theorem.name,
      code,
      rev: theorem.rev,
      module: theorem.module,
      formal_type: theorem.formal_type,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_concatenates_args() {
    let theorem = Theorem {
      id:          1,
      name:        "Nat.add_comm".into(),
      args:        vec!["(n : ℕ) ".into(), "(m : ℕ)".into()],
      goal:        "n + m = m + n".into(),
      module:      "Init.Data.Nat.Basic".into(),
      rev:         Revision::parse("v1").unwrap(),
      formal_type: None,
    };
    assert_eq!(
      theorem.code(),
      "theorem Nat.add_comm (n : ℕ) (m : ℕ) : n + m = m + n"
    );
  }

  #[test]
  fn code_without_args_keeps_spacing() {
    let theorem = Theorem {
      id:          2,
      name:        "True.intro'".into(),
      args:        vec![],
      goal:        "True".into(),
      module:      "Init.Core".into(),
      rev:         Revision::parse("v1").unwrap(),
      formal_type: Some("theorem".into()),
    };
    let result = TheoremResult::from(theorem);
    assert_eq!(result.code, "theorem True.intro'  : True");
    assert_eq!(result.formal_type.as_deref(), Some("theorem"));
  }
}
