//! Tests for `MemoryStore`, focused on per-key locking.

use std::time::Duration;

use summa_core::{
  Error,
  store::SummaryStore,
  summary::{NewSummary, Revision, Variant},
};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{MemoryStore, store::lock};

fn comprehensive() -> Variant { Variant::new("comprehensive").unwrap() }

fn bulleted() -> Variant { Variant::new("bulleted").unwrap() }

#[tokio::test]
async fn writes_flip_latest_and_keep_history() {
  let s = MemoryStore::new();
  let a = s.add_subject().await.unwrap().subject_id;

  let v1 = s
    .write_summary(NewSummary::new(a, comprehensive(), "v1"))
    .await
    .unwrap();
  let v2 = s
    .write_summary(NewSummary::new(a, comprehensive(), "v2"))
    .await
    .unwrap();
  assert_eq!(v1.revision, Revision::FIRST);
  assert_eq!(v2.revision.get(), 2);

  let history = s.get_history(a, comprehensive()).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0], v2);
  assert!(!history[1].is_latest);
  assert_eq!(history[1].updated_at, v2.created_at);

  let latest = s.get_latest(a, comprehensive()).await.unwrap();
  assert_eq!(latest, Some(v2));
  s.verify(a).await.unwrap();
}

#[tokio::test]
async fn unknown_subject_is_rejected() {
  let s = MemoryStore::new();
  let ghost = Uuid::new_v4();

  let err = s
    .write_summary(NewSummary::new(ghost, bulleted(), "x"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownSubject(id) if id == ghost));
  assert!(s.lineage(ghost, &bulleted()).is_none());
}

#[tokio::test]
async fn delete_subject_drops_every_variant() {
  let s = MemoryStore::new();
  let a = s.add_subject().await.unwrap().subject_id;
  for variant in [comprehensive(), bulleted()] {
    s.write_summary(NewSummary::new(a, variant, "text"))
      .await
      .unwrap();
  }

  assert!(s.delete_subject(a).await.unwrap());
  assert!(s.list_variants_latest(a).await.unwrap().is_empty());
  assert!(s.get_latest(a, bulleted()).await.unwrap().is_none());

  let err = s
    .write_summary(NewSummary::new(a, bulleted(), "late"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::UnknownSubject(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_across_keys_stay_gap_free() {
  let s = MemoryStore::new();
  let subjects = [
    s.add_subject().await.unwrap().subject_id,
    s.add_subject().await.unwrap().subject_id,
  ];

  let mut tasks = JoinSet::new();
  for n in 0..200u32 {
    let s = s.clone();
    let subject = subjects[(n % 2) as usize];
    let variant = if n % 4 < 2 { comprehensive() } else { bulleted() };
    tasks.spawn(async move {
      s.write_summary(NewSummary::new(subject, variant, format!("w{n}")))
        .await
    });
  }
  while let Some(joined) = tasks.join_next().await {
    joined.unwrap().unwrap();
  }

  for subject in subjects {
    s.verify(subject).await.unwrap();
    for variant in [comprehensive(), bulleted()] {
      let history = s.get_history(subject, variant).await.unwrap();
      assert_eq!(history.len(), 50);
      assert_eq!(history[0].revision.get(), 50);
    }
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn locked_key_does_not_block_other_keys() {
  let s = MemoryStore::new();
  let a = s.add_subject().await.unwrap().subject_id;
  s.write_summary(NewSummary::new(a, comprehensive(), "seed"))
    .await
    .unwrap();

  let lineage = s.lineage(a, &comprehensive()).unwrap();
  let guard = lock(&lineage);

  // A different variant of the same subject proceeds while the key is held.
  let other = s
    .write_summary(NewSummary::new(a, bulleted(), "free"))
    .await
    .unwrap();
  assert_eq!(other.revision, Revision::FIRST);

  // The same key waits for the lock.
  let handle = tokio::runtime::Handle::current();
  let blocked = {
    let s = s.clone();
    std::thread::spawn(move || {
      let queued = NewSummary::new(a, comprehensive(), "queued");
      handle.block_on(s.write_summary(queued))
    })
  };
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert!(!blocked.is_finished());

  drop(guard);
  let queued = blocked.join().unwrap().unwrap();
  assert_eq!(queued.revision.get(), 2);
  s.verify(a).await.unwrap();
}
