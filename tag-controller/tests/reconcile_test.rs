//! Reconciliation pass behavior against a scripted directory.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tag_controller::models::Device;
use tag_controller::reconciler::Reconciler;
use tag_controller::services::metrics::CountingSink;
use tag_controller::services::MockDirectory;
use tag_controller::startup::Application;
use tokio_util::sync::CancellationToken;

fn device(id: &str, name: &str, authorized: bool, tags: &[&str]) -> Device {
    Device {
        id: id.to_string(),
        name: name.to_string(),
        authorized,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|t| t.to_string()).collect()
}

fn reconciler(
    directory: &Arc<MockDirectory>,
    metrics: &Arc<CountingSink>,
) -> Reconciler {
    Reconciler::new(
        directory.clone(),
        metrics.clone(),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn applies_tags_to_authorized_untagged_devices_in_listing_order() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![
        device("1", "authorized-no-tags", true, &[]),
        device("2", "unauthorized", false, &[]),
        device("3", "authorized-with-tags", true, &["tag:x"]),
        device("4", "authorized-no-tags-2", true, &[]),
    ]));
    let metrics = Arc::new(CountingSink::default());

    reconciler(&directory, &metrics)
        .reconcile(&tags(&["tag:a", "tag:b"]))
        .await;

    let calls = directory.set_tags_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], ("1".to_string(), tags(&["tag:a", "tag:b"])));
    assert_eq!(calls[1], ("4".to_string(), tags(&["tag:a", "tag:b"])));

    assert_eq!(metrics.devices_processed.load(Ordering::SeqCst), 4);
    assert_eq!(metrics.tags_applied.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.reconcile_errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_pass_is_idempotent() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![
        device("1", "device1", true, &[]),
        device("2", "device2", true, &[]),
    ]));
    let metrics = Arc::new(CountingSink::default());
    let reconciler = reconciler(&directory, &metrics);

    reconciler.reconcile(&tags(&["tag:test"])).await;
    assert_eq!(directory.set_tags_calls().len(), 2);

    // The first pass tagged both devices, so the second applies nothing.
    reconciler.reconcile(&tags(&["tag:test"])).await;
    assert_eq!(directory.set_tags_calls().len(), 2);
    assert_eq!(metrics.tags_applied.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn continues_past_a_failing_device() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![
        device("1", "device1", true, &[]),
        device("2", "device2", true, &[]),
    ]));
    directory.fail_set_tags_for("1");
    let metrics = Arc::new(CountingSink::default());

    reconciler(&directory, &metrics)
        .reconcile(&tags(&["tag:test"]))
        .await;

    // Device 1 consumes all five attempts; device 2 succeeds first try.
    let calls = directory.set_tags_calls();
    assert_eq!(calls.len(), 6);
    assert!(calls[..5].iter().all(|(id, _)| id == "1"));
    assert_eq!(calls[5].0, "2");

    assert_eq!(metrics.reconcile_errors.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.tags_applied.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_every_failing_device_to_the_attempt_cap() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![
        device("1", "device1", true, &[]),
        device("2", "device2", true, &[]),
    ]));
    directory.fail_all_set_tags();
    let metrics = Arc::new(CountingSink::default());

    reconciler(&directory, &metrics)
        .reconcile(&tags(&["tag:test"]))
        .await;

    // 5 attempts per device x 2 devices.
    assert_eq!(directory.set_tags_calls().len(), 10);
    assert_eq!(metrics.reconcile_errors.load(Ordering::SeqCst), 2);
    assert_eq!(metrics.tags_applied.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn auto_apply_runs_a_pass_immediately_at_startup() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![device(
        "1", "device1", true, &[],
    )]));

    let mut config = common::test_config();
    config.auto_apply = true;
    config.tags_to_apply = tags(&["tag:auto"]);

    let cancel = CancellationToken::new();
    let app = Application::build(config, directory.clone(), cancel.clone())
        .await
        .expect("Failed to build application");
    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    for _ in 0..50 {
        if !directory.set_tags_calls().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(
        directory.set_tags_calls(),
        vec![("1".to_string(), tags(&["tag:auto"]))]
    );
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn listing_failure_aborts_the_pass_before_any_mutation() {
    common::init_tracing();
    let directory = Arc::new(MockDirectory::new(vec![device(
        "1", "device1", true, &[],
    )]));
    directory.fail_list();
    let metrics = Arc::new(CountingSink::default());

    reconciler(&directory, &metrics)
        .reconcile(&tags(&["tag:test"]))
        .await;

    assert!(directory.set_tags_calls().is_empty());
    assert_eq!(metrics.devices_processed.load(Ordering::SeqCst), 0);
    assert_eq!(metrics.reconcile_errors.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.passes_observed.load(Ordering::SeqCst), 1);
}
