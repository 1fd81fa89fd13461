use docket::common::{Value, CREATED_AT, UPDATED_AT};
use docket::errors::ErrorKind;
use docket::fields;
use docket::store::DocumentStoreProvider;
use docket_int_test::test_util::{cleanup, create_test_context, fake_user_name, run_test};

#[test]
fn test_create_then_get_returns_superset() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let created = access.create("Lists", fields! { name: "Groceries" })?;
            assert!(created.success);
            assert!(!created.id.is_empty());

            let doc = access.get("Lists", &created.id)?.expect("document exists");
            assert_eq!(doc.id(), created.id);
            assert_eq!(doc.get("name"), Some(&Value::from("Groceries")));
            assert!(doc.get(CREATED_AT).and_then(|v| v.as_timestamp()).is_some());
            assert_eq!(doc.fields().len(), 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_create_with_generated_fields() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            for _ in 0..20 {
                let owner = fake_user_name();
                let input = fields! { owner: (owner.as_str()), tags: ["a", "b"], count: 3 };
                let created = access.create("People", input.clone())?;
                let doc = access.get("People", &created.id)?.expect("document exists");
                for (key, value) in input.iter() {
                    assert_eq!(doc.get(key), Some(value));
                }
            }
            assert_eq!(access.get_all("People")?.len(), 20);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_keeps_created_at_and_sets_updated_at() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { name: "Groceries", color: "blue" })?.id;
            let before = access.get("Lists", &id)?.expect("document exists");

            let result = access.update("Lists", &id, fields! { name: "Groceries v2" })?;
            assert!(result.success && result.matched);

            let after = access.get("Lists", &id)?.expect("document exists");
            assert_eq!(after.get("name"), Some(&Value::from("Groceries v2")));
            assert_eq!(after.get("color"), Some(&Value::from("blue")));
            assert!(after.get(UPDATED_AT).is_some());
            assert_eq!(after.get(CREATED_AT), before.get(CREATED_AT));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_of_missing_document_is_not_an_upsert() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let result = access.update("Lists", "does-not-exist", fields! { name: "x" })?;
            assert!(result.success);
            assert!(!result.matched);
            assert!(access.get("Lists", "does-not-exist")?.is_none());
            assert!(access.get_all("Lists")?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_remove_field_makes_it_absent() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { name: "L", note: "" })?.id;

            access.remove_field("Lists", &id, "note")?;
            let doc = access.get("Lists", &id)?.expect("document exists");
            assert!(!doc.fields().contains_key("note"));
            assert_eq!(doc.get("name"), Some(&Value::from("L")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_delete_then_get_and_delete_again() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { name: "L" })?.id;

            assert!(access.delete("Lists", &id)?.existed);
            assert!(access.get("Lists", &id)?.is_none());
            let again = access.delete("Lists", &id)?;
            assert!(again.success);
            assert!(!again.existed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_collections_are_namespaced() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access.create("Lists", fields! { name: "L" })?.id;

            let raw = ctx.backend_path("Lists")?;
            assert_eq!(raw.as_str(), format!("{}Lists", ctx.prefix()));
            assert!(ctx.store().get(&raw, &id)?.is_some());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_nested_collection_paths() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let a = access.create("lists/a/items", fields! { field1: "x" })?.id;
            access.create("lists/b/items", fields! { field1: "y" })?;

            let items = access.get_all("lists/a/items")?;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].id(), a);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_invalid_input_is_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;

            let err = access.create("bad name", fields! { a: 1 }).err().expect("rejected");
            assert_eq!(err.kind(), &ErrorKind::InvalidCollectionName);
            assert!(!err.is_retryable());

            let err = access.get("Lists", "").err().expect("rejected");
            assert_eq!(err.kind(), &ErrorKind::InvalidArgument);

            let err = access.delete("Lists", "a/b").err().expect("rejected");
            assert_eq!(err.kind(), &ErrorKind::InvalidArgument);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
