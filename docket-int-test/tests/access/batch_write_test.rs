use docket::common::{Value, CREATED_AT};
use docket::errors::ErrorKind;
use docket::store::memory::InMemoryStoreConfig;
use docket_int_test::test_util::{
    cleanup, create_test_context, create_test_context_with, fake_items, ids, run_test,
};

#[test]
fn test_batch_of_1200_commits_three_chunks() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let result = access.batch_write("Items", fake_items(1200)?)?;

            assert!(result.success);
            assert_eq!(result.chunks, 3);
            assert_eq!(result.ids.len(), 1200);
            assert_eq!(ctx.store().commit_sizes(), vec![500, 500, 200]);

            let all = access.get_all("Items")?;
            assert_eq!(all.len(), 1200);
            assert_eq!(ids(&all), result.ids);
            let first = all.first().and_then(|d| d.get("field2")).cloned();
            assert_eq!(first, Some(Value::Int(0)));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_exact_multiple_of_the_limit() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let result = access.batch_write("Items", fake_items(1000)?)?;
            assert_eq!(result.chunks, 2);
            assert_eq!(ctx.store().commit_sizes(), vec![500, 500]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_batch_items_get_no_created_at() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            access.batch_write("Items", fake_items(3)?)?;
            let all = access.get_all("Items")?;
            assert!(all.iter().all(|d| d.get(CREATED_AT).is_none()));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_second_chunk_failure_keeps_first_chunk() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            ctx.store().fail_commit(2, ErrorKind::Unavailable);

            let err = access
                .batch_write("Items", fake_items(1200)?)
                .err()
                .expect("second chunk fails");
            assert_eq!(err.kind(), &ErrorKind::BackendWrite);
            assert!(err.is_retryable());

            let failure = err.batch_failure().expect("batch progress is reported");
            assert_eq!(failure.failed_chunk, 1);
            assert_eq!(failure.total_chunks, 3);
            assert_eq!(failure.committed_chunks(), 1);
            assert_eq!(failure.committed_ids.len(), 500);

            let all = access.get_all("Items")?;
            assert_eq!(all.len(), 500);
            assert_eq!(ids(&all), failure.committed_ids);
            assert_eq!(ctx.store().commit_sizes(), vec![500, 500]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_permanent_failure_is_not_retryable() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            ctx.store().fail_commit(1, ErrorKind::PermissionDenied);

            let err = access
                .batch_write("Items", fake_items(10)?)
                .err()
                .expect("commit fails");
            assert!(!err.is_retryable());
            assert_eq!(err.batch_failure().map(|f| f.committed_ids.len()), Some(0));
            assert!(access.get_all("Items")?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_store_limit_caps_chunk_size() {
    run_test(
        || create_test_context_with(InMemoryStoreConfig::new().with_max_batch_size(100)),
        |ctx| {
            let access = ctx.docket().access()?;
            let result = access.batch_write("Items", fake_items(250)?)?;
            assert_eq!(result.chunks, 3);
            assert_eq!(ctx.store().commit_sizes(), vec![100, 100, 50]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_empty_batch_commits_nothing() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let result = access.batch_write("Items", Vec::new())?;
            assert!(result.success);
            assert_eq!(result.chunks, 0);
            assert!(ctx.store().commit_sizes().is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
