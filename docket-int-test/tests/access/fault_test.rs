use docket::errors::ErrorKind;
use docket::fields;
use docket_int_test::test_util::{cleanup, create_test_context, run_test, Operation};

#[test]
fn test_backend_faults_are_wrapped_and_classified() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let store = ctx.store();

            store.fail(Operation::Add, ErrorKind::Timeout);
            let err = access.create("Lists", fields! { a: 1 }).err().expect("add fails");
            assert_eq!(err.kind(), &ErrorKind::BackendWrite);
            assert_eq!(err.root_cause().kind(), &ErrorKind::Timeout);
            assert!(err.is_retryable());

            store.fail(Operation::Get, ErrorKind::PermissionDenied);
            let err = access.get("Lists", "x").err().expect("get fails");
            assert_eq!(err.kind(), &ErrorKind::BackendRead);
            assert!(!err.is_retryable());

            store.fail(Operation::Query, ErrorKind::QuotaExceeded);
            let err = access.get_all("Lists").err().expect("query fails");
            assert_eq!(err.kind(), &ErrorKind::BackendRead);
            assert!(err.is_retryable());

            store.heal();
            assert!(access.create("Lists", fields! { a: 1 })?.success);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_update_and_delete() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { a: 1 })?.id;

            ctx.store().fail(Operation::Update, ErrorKind::Aborted);
            let err = access.update("Lists", &id, fields! { a: 2 }).err().expect("update fails");
            assert_eq!(err.kind(), &ErrorKind::BackendWrite);
            assert!(err.is_retryable());
            let err = access.remove_field("Lists", &id, "a").err().expect("update fails");
            assert_eq!(err.kind(), &ErrorKind::BackendWrite);

            ctx.store().fail(Operation::Delete, ErrorKind::Unavailable);
            assert!(access.delete("Lists", &id).is_err());

            ctx.store().heal();
            let doc = access.get("Lists", &id)?.expect("still there");
            assert_eq!(doc.get("a").and_then(|v| v.as_i64()), Some(1));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_subscription_setup_failure() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            ctx.store().fail(Operation::Listen, ErrorKind::Unavailable);
            let err = access.subscribe("Lists", None).err().expect("listen fails");
            assert_eq!(err.kind(), &ErrorKind::BackendRead);
            assert!(err.is_retryable());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_client() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            ctx.docket().close()?;

            let err = access.create("Lists", fields! { a: 1 }).err().expect("client closed");
            assert_eq!(err.kind(), &ErrorKind::ClientClosed);
            assert!(!err.is_retryable());
            assert!(ctx.docket().access().is_err());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
