//! Query normalisation. Turns a raw proof state into the canonical text the
//! embedding model was trained on.
//!
//! A proof state looks like
//!
//! ```text
//! h1 : Nat
//! h2 : Nat
//! ⊢ h1 = h2
//! ```
//!
//! The hypotheses become a *context* block where each declaration is prefixed
//! with [`CONTEXT_MARKER`], and the goal is prefixed with [`GOAL_MARKER`].
//! Corpus theorems are rendered with the same markers from their stored
//! `args` / `goal` ([`context_text`], [`goal_text`]), so index-time and
//! query-time texts live in the same space.

/// Separates the hypothesis block from the goal.
pub const TURNSTILE: char = '⊢';

/// Prefix of every hypothesis / argument declaration.
pub const CONTEXT_MARKER: &str = "<VAR>";

/// Prefix of the goal.
pub const GOAL_MARKER: &str = "<GOAL>";

/// A proof state split into its two marker-prefixed halves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
  /// Concatenated `<VAR>`-prefixed hypotheses; empty if there are none.
  pub context: String,
  /// `<GOAL>` followed by the trimmed goal.
  pub goal:    String,
}

impl NormalizedQuery {
  /// The full canonical query text: context immediately followed by goal.
  pub fn text(&self) -> String {
    let mut text = String::with_capacity(self.context.len() + self.goal.len());
    text.push_str(&self.context);
    text.push_str(&self.goal);
    text
  }
}

/// Normalise a raw proof-state string.
///
/// Only the first [`TURNSTILE`] splits; any later one is part of the goal.
/// Without a turnstile the whole input is treated as hypotheses and the goal
/// is empty.
pub fn normalize(raw: &str) -> NormalizedQuery {
  let (hypotheses, goal) = raw.split_once(TURNSTILE).unwrap_or((raw, ""));

  let cleaned = join_continuation_lines(hypotheses);
  let context = cleaned
    .trim()
    .split('\n')
    .filter(|line| line.contains(':'))
    .fold(String::new(), |mut acc, line| {
      acc.push_str(CONTEXT_MARKER);
      acc.push_str(line);
      acc
    });

  NormalizedQuery { context, goal: goal_text(goal.trim()) }
}

/// Render stored theorem arguments as a context block.
pub fn context_text<S: AsRef<str>>(args: &[S]) -> String {
  args.iter().fold(String::new(), |mut acc, arg| {
    acc.push_str(CONTEXT_MARKER);
    acc.push_str(arg.as_ref());
    acc
  })
}

/// Render a goal with its marker.
pub fn goal_text(goal: &str) -> String { format!("{GOAL_MARKER}{goal}") }

/// Remove every newline that is followed by at least one whitespace
/// character, together with that whitespace run.
///
/// Pretty-printers wrap long hypotheses onto indented continuation lines;
/// this glues them back onto the declaration they belong to. A newline
/// directly followed by a non-whitespace character starts a new hypothesis
/// and is kept.
fn join_continuation_lines(block: &str) -> String {
  let mut out = String::with_capacity(block.len());
  let mut chars = block.chars().peekable();

  while let Some(c) = chars.next() {
    if c == '\n' && chars.peek().is_some_and(|next| next.is_whitespace()) {
      while chars.peek().is_some_and(|next| next.is_whitespace()) {
        chars.next();
      }
      continue;
    }
    out.push(c);
  }

  out
}
