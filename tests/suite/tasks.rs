//! Task completion as seen by hosts awaiting native results

use std::future::IntoFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appcenter_core::{AppCenterTask, TaskError};

#[tokio::test]
async fn await_resolves_after_native_completion() {
    let (completer, task) = AppCenterTask::<u32>::pending();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        completer.complete(7);
    });
    assert_eq!(task.await, Ok(7));
}

#[tokio::test]
async fn pending_task_does_not_resolve_early() {
    let (_completer, task) = AppCenterTask::<u32>::pending();
    let outcome = tokio::time::timeout(Duration::from_millis(20), task.into_future()).await;
    assert!(outcome.is_err());
}

#[tokio::test]
async fn dropped_completer_resolves_as_abandoned() {
    let (completer, task) = AppCenterTask::<u32>::pending();
    drop(completer);
    assert_eq!(task.await, Err(TaskError::Abandoned));
}

#[test]
fn continuations_fire_once_in_order() {
    let task = AppCenterTask::<&'static str>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let seen = Arc::clone(&seen);
        task.continue_with(move |task| {
            seen.lock().unwrap().push((label, task.result()));
        });
    }
    assert!(seen.lock().unwrap().is_empty());

    task.set_result("done").unwrap();
    assert_eq!(task.set_result("again"), Err(TaskError::AlreadyCompleted));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("first", Some("done")),
            ("second", Some("done")),
            ("third", Some("done")),
        ]
    );
}

#[test]
fn mapped_task_follows_source() {
    let source = AppCenterTask::<i32>::new();
    let doubled = source.map(|value| value * 2);
    assert!(!doubled.is_completed());
    source.set_result(21).unwrap();
    assert_eq!(doubled.wait(), Ok(42));
}
