/// Job lifecycle tests
///
/// Publication order, staleness visibility under concurrent readers and the
/// session view of job notifications.

mod common;

use common::{job, processor, repository, share, CountingSink};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use grin_pool::config::SessionSettings;
use grin_pool::shares::{PolicyFlags, ShareStatus, WorkerIdentity};
use grin_pool::stratum::{ConnectionContext, ConnectionFactory, GrinSessionFactory};

// ═══════════════════════════════════════════════════════════════════════════
// 1. Staleness
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_higher_height_marks_previous_stale() {
    let repo = repository(4);
    let a = repo.publish(job(1, 100, 1_000));
    let b = repo.publish(job(2, 100, 1_000));
    assert!(!a.is_stale() && !b.is_stale());

    let c = repo.publish(job(3, 101, 1_000));
    assert!(a.is_stale());
    assert!(b.is_stale());
    assert!(!c.is_stale());
    assert_eq!(repo.current_height(), 101);
}

#[test]
fn test_stale_is_never_reset() {
    let repo = repository(8);
    let a = repo.publish(job(1, 100, 1_000));
    repo.publish(job(2, 101, 1_000));
    repo.publish(job(3, 100, 1_000));
    assert!(a.is_stale());
}

#[test]
fn test_ingest_rejects_height_mismatch() {
    let repo = repository(4);
    let raw = serde_json::json!({
        "jobId": 1u64,
        "nodeJobId": 1u64,
        "height": 101u64,
        "prePow": hex::encode(100u64.to_be_bytes()),
        "difficulty": 10u64,
    })
    .to_string();
    assert!(repo.ingest(raw.as_bytes()).is_err());
    assert!(repo.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// 2. Concurrent readers
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_readers_never_see_fresh_job_beside_newer_height() {
    const HEIGHTS: u64 = 2_000;
    let repo = repository(4);
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for h in 1..=HEIGHTS {
                // two jobs per height, ids encode the height
                repo.publish(job(h * 10, h, 1_000));
                repo.publish(job(h * 10 + 1, h, 1_000));
            }
            done.store(true, Ordering::Release);
        });

        (0..4).into_par_iter().for_each(|_| {
            while !done.load(Ordering::Acquire) {
                let Some(latest) = repo.latest() else { continue };
                let h = latest.height();
                for older in h.saturating_sub(4)..h {
                    for id in [older * 10, older * 10 + 1] {
                        if let Some(old) = repo.lookup(id) {
                            assert!(old.is_stale(), "job {} at height {} fresh beside height {}", id, older, h);
                        }
                    }
                }
            }
        });
    });

    assert_eq!(repo.current_height(), HEIGHTS);
    assert!(repo.len() <= 8);
}

#[test]
fn test_parallel_lookups_share_one_handle() {
    let repo = repository(4);
    let published = repo.publish(job(5, 100, 1_000));

    let all_same = (0..256)
        .into_par_iter()
        .map(|_| repo.lookup(5))
        .all(|h| h.map(|h| Arc::ptr_eq(&h, &published)).unwrap_or(false));
    assert!(all_same);
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Sessions
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_session_grades_with_offered_difficulties() {
    let repo = repository(4);
    let sink = Arc::new(CountingSink::default());
    let processor = Arc::new(processor(repo.clone(), sink, PolicyFlags::default()));
    let factory = GrinSessionFactory::new(processor, &SessionSettings { default_difficulty: 10, max_sessions: 4 });

    let mut session = factory.create(ConnectionContext::new("10.0.0.7:4000".parse().unwrap())).unwrap();
    repo.publish(job(1, 100, 1_000_000));
    let notify = session.next_job().await.unwrap();
    assert_eq!(notify.job.job_id(), 1);
    session.set_difficulty(100);

    let worker = WorkerIdentity { user_id: 1, worker_id: 1, full_name: "rig".to_string() };

    let mut s = share(1, 100, 150);
    let outcome = session.submit(&mut s, &worker).await.unwrap();
    assert_eq!(outcome.status, ShareStatus::Accept);
    assert_eq!(outcome.assigned_difficulty, Some(100));

    let mut s = share(1, 100, 50);
    let outcome = session.submit(&mut s, &worker).await.unwrap();
    assert_eq!(outcome.assigned_difficulty, Some(10));

    // no difficulty was ever offered for an unknown job
    let mut s = share(2, 100, 50);
    let outcome = session.submit(&mut s, &worker).await.unwrap();
    assert_eq!(outcome.status, ShareStatus::JobNotFound);
}

#[tokio::test]
async fn test_session_sees_clean_flags_in_order() {
    let repo = repository(4);
    let processor = Arc::new(processor(repo.clone(), Arc::new(CountingSink::default()), PolicyFlags::default()));
    let factory = GrinSessionFactory::new(processor, &SessionSettings::default());
    let mut session = factory.create(ConnectionContext::new("10.0.0.8:4000".parse().unwrap())).unwrap();

    repo.publish(job(1, 100, 1_000));
    repo.publish(job(2, 100, 1_000));
    repo.publish(job(3, 101, 1_000));

    let mut seen = Vec::new();
    for _ in 0..3 {
        let n = session.next_job().await.unwrap();
        seen.push((n.job.job_id(), n.is_clean));
    }
    assert_eq!(seen, vec![(1, true), (2, false), (3, true)]);
    assert_eq!(session.current_job_id(), Some(3));
}
