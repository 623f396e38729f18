//! Per-revision readers-writer guard.
//!
//! Searches share a revision; a reindex of that revision excludes them.
//! Readers never wait: while a writer holds the lock or is queued for it,
//! [`RevisionLocks::try_read`] fails with [`Error::RevisionBusy`].

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

use statesearch_core::Revision;
use tokio::{
  sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock},
  time::Instant,
};

use crate::{Error, Result};

type LockMap = Arc<Mutex<HashMap<Revision, Arc<RwLock<()>>>>>;

/// Entries live only while some guard or waiter holds them, so the map is
/// bounded by the number of in-flight requests, not by the tags clients send.
#[derive(Default)]
pub struct RevisionLocks {
  locks: LockMap,
}

/// Held for the duration of a search or reindex. Dropping it releases the
/// lock and forgets the revision's entry once nobody else refers to it.
pub struct RevisionGuard<G> {
  guard: Option<G>,
  rev:   Revision,
  locks: LockMap,
}

pub type ReadGuard = RevisionGuard<OwnedRwLockReadGuard<()>>;
pub type WriteGuard = RevisionGuard<OwnedRwLockWriteGuard<()>>;

impl<G> Drop for RevisionGuard<G> {
  fn drop(&mut self) {
    drop(self.guard.take());
    prune(&self.locks, &self.rev);
  }
}

/// Remove `rev` if the map holds the only reference to its lock. Clones are
/// taken under the same mutex, so a count of one cannot race with a lookup.
fn prune(locks: &LockMap, rev: &Revision) {
  let mut map = locks.lock().unwrap_or_else(PoisonError::into_inner);
  if map.get(rev).is_some_and(|lock| Arc::strong_count(lock) == 1) {
    map.remove(rev);
  }
}

impl RevisionLocks {
  pub fn new() -> Self { Self::default() }

  fn lock_for(&self, rev: &Revision) -> Arc<RwLock<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(rev.clone()).or_default().clone()
  }

  fn guard<G>(&self, rev: &Revision, guard: G) -> RevisionGuard<G> {
    RevisionGuard { guard: Some(guard), rev: rev.clone(), locks: self.locks.clone() }
  }

  /// Shared access to `rev`, or [`Error::RevisionBusy`] without waiting.
  pub fn try_read(&self, rev: &Revision) -> Result<ReadGuard> {
    match self.lock_for(rev).try_read_owned() {
      Ok(guard) => Ok(self.guard(rev, guard)),
      Err(_) => {
        prune(&self.locks, rev);
        Err(Error::RevisionBusy(rev.clone()))
      }
    }
  }

  /// Exclusive access to `rev`. Waits for in-flight readers to finish.
  pub async fn write(&self, rev: &Revision) -> WriteGuard {
    let guard = self.lock_for(rev).write_owned().await;
    self.guard(rev, guard)
  }

  /// Number of revisions currently tracked.
  pub fn len(&self) -> usize { self.locks.lock().unwrap_or_else(PoisonError::into_inner).len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Run one pipeline step, failing with [`Error::Timeout`] if `deadline`
/// passes first.
pub(crate) async fn within<T>(
  deadline: Option<Instant>,
  step: &'static str,
  fut: impl Future<Output = Result<T>>,
) -> Result<T> {
  match deadline {
    Some(at) => tokio::time::timeout_at(at, fut)
      .await
      .map_err(|_| Error::Timeout(step))?,
    None => fut.await,
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  fn rev(tag: &str) -> Revision { Revision::parse(tag).unwrap() }

  #[tokio::test]
  async fn readers_share_and_writers_exclude() {
    let locks = RevisionLocks::new();
    let a = locks.try_read(&rev("v1")).unwrap();
    let b = locks.try_read(&rev("v1")).unwrap();
    drop((a, b));

    let _w = locks.write(&rev("v1")).await;
    assert!(matches!(locks.try_read(&rev("v1")), Err(Error::RevisionBusy(_))));
    assert!(locks.try_read(&rev("v2")).is_ok());
  }

  #[tokio::test]
  async fn queued_writer_turns_new_readers_away() {
    let locks = Arc::new(RevisionLocks::new());
    let reader = locks.try_read(&rev("v1")).unwrap();

    let writer = tokio::spawn({
      let locks = locks.clone();
      async move {
        let _w = locks.write(&rev("v1")).await;
      }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(locks.try_read(&rev("v1")), Err(Error::RevisionBusy(_))));
    drop(reader);
    writer.await.unwrap();
    assert!(locks.try_read(&rev("v1")).is_ok());
  }

  #[tokio::test]
  async fn released_revisions_are_forgotten() {
    let locks = RevisionLocks::new();
    for n in 0..1000 {
      let _r = locks.try_read(&rev(&format!("nope{n}"))).unwrap();
    }
    assert!(locks.is_empty());

    let held = locks.try_read(&rev("v1")).unwrap();
    let other = locks.try_read(&rev("v1")).unwrap();
    drop(held);
    assert_eq!(locks.len(), 1);
    drop(other);
    assert!(locks.is_empty());

    let w = locks.write(&rev("v1")).await;
    assert!(locks.try_read(&rev("v1")).is_err());
    assert_eq!(locks.len(), 1);
    drop(w);
    assert!(locks.is_empty());
  }

  #[tokio::test]
  async fn expired_deadline_is_a_timeout() {
    let deadline = Instant::now() + Duration::from_millis(10);
    let result = within(Some(deadline), "sleep", async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok(())
    })
    .await;
    assert!(matches!(result, Err(Error::Timeout("sleep"))));

    let value = within(None, "noop", async { Ok(7) }).await.unwrap();
    assert_eq!(value, 7);
  }
}
