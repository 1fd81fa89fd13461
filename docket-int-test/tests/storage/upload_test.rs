use docket::errors::ErrorKind;
use docket_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_upload_reports_progress_and_returns_url() {
    run_test(
        || create_test_context(),
        |ctx| {
            let blob_store = ctx.docket().blob_store()?.with_chunk_size(1024);
            let bytes = vec![7u8; 4000];

            let mut percents = Vec::new();
            let url = blob_store.upload_file("receipts/2024", "march.pdf", &bytes, |p| {
                percents.push(p.percent)
            })?;

            assert_eq!(url, "memory://test-bucket/receipts/2024/march.pdf");
            assert_eq!(percents.len(), 4);
            assert!(percents.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(percents.last().copied(), Some(100.0));
            assert_eq!(ctx.blob_store().object("receipts/2024/march.pdf"), Some(bytes));
            assert_eq!(blob_store.download_url("receipts/2024/march.pdf")?, url);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_bad_file_name_is_a_storage_error() {
    run_test(
        || create_test_context(),
        |ctx| {
            let blob_store = ctx.docket().blob_store()?;
            let err = blob_store
                .upload_file("receipts", "../escape", b"x", |_| {})
                .err()
                .expect("rejected");
            assert_eq!(err.kind(), &ErrorKind::StorageError);
            assert_eq!(ctx.blob_store().pending_uploads(), 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
