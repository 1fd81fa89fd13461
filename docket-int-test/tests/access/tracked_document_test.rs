use docket::collection::{EntityState, FieldPatch, Resolution, TrackedDocument};
use docket::common::Value;
use docket::errors::ErrorKind;
use docket::fields;
use docket_int_test::test_util::{cleanup, create_test_context, run_test, Operation};
use std::time::Duration;

#[test]
fn test_pending_write_is_confirmed() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Items", fields! { qty: 1, name: "Lait" })?.id;
            let mut tracked = TrackedDocument::new(access.get("Items", &id)?.expect("exists"));

            tracked.stage(FieldPatch::new().set("qty", 2))?;
            assert_eq!(tracked.state(), EntityState::PendingWrite);
            assert_eq!(tracked.local().and_then(|f| f.get("qty")), Some(&Value::Int(2)));

            let result = access.save_tracked("Items", &mut tracked)?;
            assert!(result.matched);
            assert_eq!(tracked.state(), EntityState::Clean);

            let stored = access.get("Items", &id)?.expect("exists");
            assert_eq!(stored.get("qty"), Some(&Value::Int(2)));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_write_rolls_back_local_state() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Items", fields! { qty: 1 })?.id;
            let mut tracked = TrackedDocument::new(access.get("Items", &id)?.expect("exists"));
            tracked.stage(FieldPatch::new().set("qty", 5))?;

            ctx.store().fail(Operation::Update, ErrorKind::Unavailable);
            let err = access.save_tracked("Items", &mut tracked).err().expect("write fails");
            assert!(err.is_retryable());
            assert_eq!(tracked.state(), EntityState::Clean);
            assert_eq!(tracked.local().and_then(|f| f.get("qty")), Some(&Value::Int(1)));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_concurrent_remote_change_is_a_conflict() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Items", fields! { qty: 1 })?.id;
            let subscription = access.subscribe("Items", None)?;
            let first = subscription.next_timeout(Duration::from_secs(2)).expect("snapshot");

            let mut tracked = TrackedDocument::new(first[0].clone());
            tracked.stage(FieldPatch::new().set("qty", 2))?;

            // another client writes first
            access.update("Items", &id, fields! { qty: 7 })?;
            let snapshot = subscription.next_timeout(Duration::from_secs(2)).expect("update");
            tracked.observe(snapshot.iter().find(|d| d.id() == id));
            assert_eq!(tracked.state(), EntityState::Conflict);

            tracked.resolve(Resolution::TakeRemote)?;
            assert_eq!(tracked.state(), EntityState::Clean);
            assert_eq!(tracked.local().and_then(|f| f.get("qty")), Some(&Value::Int(7)));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_remote_delete_while_pending_is_a_conflict() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Items", fields! { qty: 1 })?.id;
            let mut tracked = TrackedDocument::new(access.get("Items", &id)?.expect("exists"));
            tracked.stage(FieldPatch::new().set("qty", 2))?;

            access.delete("Items", &id)?;
            tracked.observe(access.get("Items", &id)?.as_ref());
            assert_eq!(tracked.state(), EntityState::Conflict);
            assert!(tracked.stage(FieldPatch::new().set("qty", 3)).is_err());

            tracked.resolve(Resolution::KeepLocal)?;
            assert_eq!(tracked.state(), EntityState::PendingWrite);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_save_with_unresolved_conflict_keeps_remote_value() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Items", fields! { qty: 1 })?.id;
            let mut tracked = TrackedDocument::new(access.get("Items", &id)?.expect("exists"));
            tracked.stage(FieldPatch::new().set("qty", 2))?;

            access.update("Items", &id, fields! { qty: 5 })?;
            tracked.observe(access.get("Items", &id)?.as_ref());
            assert_eq!(tracked.state(), EntityState::Conflict);

            let err = access.save_tracked("Items", &mut tracked).err().expect("conflict");
            assert_eq!(err.kind(), &ErrorKind::Conflict);
            assert_eq!(tracked.state(), EntityState::Conflict);
            let stored = access.get("Items", &id)?.expect("exists");
            assert_eq!(stored.get("qty"), Some(&Value::Int(5)));

            tracked.resolve(Resolution::TakeRemote)?;
            assert_eq!(tracked.state(), EntityState::Clean);
            assert!(access.save_tracked("Items", &mut tracked)?.matched);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
