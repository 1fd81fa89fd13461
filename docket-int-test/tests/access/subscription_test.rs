use docket::collection::field;
use docket::common::Value;
use docket::fields;
use docket_int_test::test_util::{cleanup, create_test_context, ids, run_test, wait_for};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn test_first_snapshot_is_current_state() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { name: "A" })?.id;

            let subscription = access.subscribe("Lists", None)?;
            let snapshot = subscription.next_timeout(WAIT).expect("initial snapshot");
            assert_eq!(ids(&snapshot), vec![id]);
            subscription.cancel();
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_filtered_subscription_only_delivers_matches() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
            let violations = Arc::new(Mutex::new(0));

            let sink = seen.clone();
            let bad = violations.clone();
            let subscription = access.subscribe_with(
                "Lists",
                Some(field("userId").eq("u1")),
                move |snapshot| {
                    if snapshot.iter().any(|d| d.get("userId") != Some(&Value::from("u1"))) {
                        *bad.lock() += 1;
                    }
                    sink.lock().push(ids(&snapshot));
                },
            )?;

            let mine = access.create("Lists", fields! { userId: "u1", name: "mine" })?.id;
            access.create("Lists", fields! { userId: "u2", name: "theirs" })?;
            access.create("Lists", fields! { name: "nobody" })?;
            wait_for(2000, || seen.lock().last() == Some(&vec![mine.clone()]));

            access.delete("Lists", &mine)?;
            wait_for(2000, || seen.lock().last().is_some_and(|s| s.is_empty()));

            assert_eq!(*violations.lock(), 0);
            subscription.cancel();
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_document_leaving_the_filter_is_dropped() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { userId: "u1" })?.id;
            let subscription = access.subscribe("Lists", Some(field("userId").eq("u1")))?;
            assert_eq!(subscription.next_timeout(WAIT).map(|s| s.len()), Some(1));

            access.update("Lists", &id, fields! { userId: "u2" })?;
            let snapshot = subscription.next_timeout(WAIT).expect("update delivered");
            assert!(snapshot.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_slow_reader_sees_latest_state() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let subscription = access.subscribe("Items", None)?;

            for n in 0..50 {
                access.create("Items", fields! { n: n })?;
            }
            wait_for(2000, || {
                access
                    .get_all("Items")
                    .map(|all| all.len() == 50)
                    .unwrap_or(false)
            });

            let mut last = Vec::new();
            while let Some(snapshot) = subscription.next_timeout(Duration::from_millis(300)) {
                last = snapshot;
            }
            assert_eq!(last.len(), 50);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cancel_stops_delivery_and_unblocks_reader() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let subscription = Arc::new(access.subscribe("Lists", None)?);
            assert!(subscription.next_timeout(WAIT).is_some());

            let reader = subscription.clone();
            let handle = thread::spawn(move || reader.next());
            thread::sleep(Duration::from_millis(50));

            subscription.cancel();
            subscription.cancel();
            assert!(handle.join().expect("reader thread").is_none());

            access.create("Lists", fields! { name: "late" })?;
            assert!(subscription.next_timeout(Duration::from_millis(200)).is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_independent_subscriptions() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let first = access.subscribe("Lists", None)?;
            let second = access.subscribe("Lists", None)?;
            first.next_timeout(WAIT);
            second.next_timeout(WAIT);

            first.cancel();
            access.create("Lists", fields! { name: "x" })?;
            let snapshot = second.next_timeout(WAIT).expect("second still live");
            assert_eq!(snapshot.len(), 1);
            assert!(first.next_timeout(Duration::from_millis(100)).is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
