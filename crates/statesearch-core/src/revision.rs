//! Revision tags: the label that partitions the corpus into independent
//! generations.
//!
//! A revision names both a set of theorem rows (by their `rev` column) and a
//! vector-store collection, so the tag must be usable verbatim as a
//! collection name in a URL path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Upper bound on the byte length of a revision tag.
pub const MAX_REVISION_LEN: usize = 128;

/// A validated revision tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
  /// Validate `tag` and wrap it.
  ///
  /// Accepts ASCII letters, digits, `.`, `_` and `-`.
  pub fn parse(tag: impl Into<String>) -> Result<Self> {
    let tag = tag.into();
    if tag.is_empty() {
      return Err(Error::EmptyRevision);
    }
    if tag.len() > MAX_REVISION_LEN {
      return Err(Error::RevisionTooLong { max: MAX_REVISION_LEN });
    }
    let valid = tag
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
      return Err(Error::InvalidRevision(tag));
    }
    Ok(Self(tag))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Revision {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(value) }
}

impl From<Revision> for String {
  fn from(value: Revision) -> Self { value.0 }
}

impl AsRef<str> for Revision {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for Revision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_version_like_tags() {
    for tag in ["v4.9.0", "mathlib_2024-05-01", "a1b2c3d"] {
      assert_eq!(Revision::parse(tag).unwrap().as_str(), tag);
    }
  }

  #[test]
  fn rejects_empty_and_path_like_tags() {
    assert!(matches!(Revision::parse(""), Err(Error::EmptyRevision)));
    assert!(matches!(
      Revision::parse("../v1"),
      Err(Error::InvalidRevision(_))
    ));
    assert!(matches!(
      Revision::parse("v 1"),
      Err(Error::InvalidRevision(_))
    ));
    assert!(matches!(
      Revision::parse("x".repeat(MAX_REVISION_LEN + 1)),
      Err(Error::RevisionTooLong { .. })
    ));
  }

  #[test]
  fn deserialization_validates() {
    let ok: Revision = serde_json::from_str("\"v1\"").unwrap();
    assert_eq!(ok.as_str(), "v1");
    assert!(serde_json::from_str::<Revision>("\"v/1\"").is_err());
  }
}
