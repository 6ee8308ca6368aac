use crate::{init_log, START};

use login_server::store::MemoryStore;
use login_server::util::ManualClock;
use login_server::window::WindowAdmission;

use std::sync::Arc;

fn window(size: i64, slice: u64) -> (Arc<ManualClock>, Arc<WindowAdmission>) {
    init_log();
    let clock = Arc::new(ManualClock::new(START));
    let store = Arc::new(MemoryStore::new(clock.clone()));
    (clock, Arc::new(WindowAdmission::new(store, size, slice)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_occupy_never_oversells() {
    let (_, window) = window(100, 5);
    let slice_id = window.slice_id(START);

    let tasks = (0..150)
        .map(|_| {
            let window = window.clone();
            tokio::spawn(async move { window.occupy(slice_id).await.unwrap() })
        })
        .collect::<Vec<_>>();
    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 100);
    assert_eq!(window.occupied(slice_id).await.unwrap(), 150);
    assert_eq!(window.remaining(slice_id).await.unwrap(), 0);
}

#[tokio::test]
async fn next_slice_starts_empty() {
    let (clock, window) = window(2, 5);
    let slice_id = window.slice_id(START);
    assert!(window.occupy(slice_id).await.unwrap());
    assert!(window.occupy(slice_id).await.unwrap());
    assert!(!window.occupy(slice_id).await.unwrap());

    clock.advance(5);
    let next = window.slice_id(START + 5);
    assert_eq!(next, slice_id + 1);
    assert_eq!(window.remaining(next).await.unwrap(), 2);

    // 两个时间片后旧计数过期
    clock.advance(5);
    assert_eq!(window.occupied(slice_id).await.unwrap(), 0);
}
