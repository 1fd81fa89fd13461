use docket::common::{SortOrder, Value, IS_FAVORITE};
use docket::errors::ErrorKind;
use docket::fields;
use docket::lists::{items_path, ListMetadata, ListService, ListView, SortState};
use docket_int_test::test_util::{cleanup, create_test_context, fake_items, run_test};
use std::time::Duration;

#[test]
fn test_owned_lists_follow_pin_and_name_order() {
    run_test(
        || create_test_context(),
        |ctx| {
            let lists = ctx.docket().lists()?;
            let subscription = lists.owned_lists("u1")?;
            assert_eq!(subscription.next_timeout(Duration::from_secs(2)).map(|s| s.len()), Some(0));

            let courses = lists.create_list(&ListMetadata::new("courses", "u1"))?;
            lists.create_list(&ListMetadata::new("Bricolage", "u1"))?;
            lists.create_list(&ListMetadata::new("Films", "u2"))?;

            let stored = lists.get_list(&courses)?.expect("list exists");
            lists.toggle_pin(&stored)?;

            let mut names = Vec::new();
            while let Some(snapshot) = subscription.next_timeout(Duration::from_millis(300)) {
                names = ListService::lists_from_snapshot(&snapshot)
                    .into_iter()
                    .map(|l| l.name)
                    .collect();
            }
            assert_eq!(names, vec!["courses", "Bricolage"]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_legacy_list_is_normalised() {
    run_test(
        || create_test_context(),
        |ctx| {
            let access = ctx.docket().access()?;
            let id = access
                .create(
                    "MesListes",
                    fields! { name: "Ancienne", userId: "u1", fieldLabels: { field2: "Qté", field1: "Produit" } },
                )?
                .id;

            let list = ctx.docket().lists()?.get_list(&id)?.expect("list exists");
            assert_eq!(list.color, "blue");
            assert_eq!(list.visible_field_keys(), vec!["field1", "field2"]);
            assert_eq!(list.fields_config["field1"].label, "Produit");
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicate_large_list_uses_batches() {
    run_test(
        || create_test_context(),
        |ctx| {
            let lists = ctx.docket().lists()?;
            let access = ctx.docket().access()?;
            let source = lists.create_list(&ListMetadata::new("Stock", "u1").with_labels(&["Nom", "N"]))?;
            access.batch_write(&items_path(&source), fake_items(600)?)?;

            let copy = lists.duplicate_list(&source, "u1")?;
            assert_eq!(copy.name, "Stock (Copie)");
            assert_eq!(copy.items, 600);
            assert_eq!(access.get_all(&items_path(&copy.list_id))?.len(), 600);
            assert_eq!(access.get_all(&items_path(&source))?.len(), 600);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_item_view_over_live_snapshot() {
    run_test(
        || create_test_context(),
        |ctx| {
            let lists = ctx.docket().lists()?;
            let list_id = lists.create_list(&ListMetadata::new("Courses", "u1").with_labels(&["Produit"]))?;
            for name in ["pain", "Beurre", "lait"] {
                lists.add_item(&list_id, fields! { field1: name })?;
            }

            let subscription = lists.items(&list_id)?;
            let mut snapshot = Vec::new();
            while let Some(next) = subscription.next_timeout(Duration::from_millis(300)) {
                snapshot = next;
            }
            assert_eq!(snapshot.len(), 3);

            let pain = snapshot
                .iter()
                .find(|d| d.get("field1") == Some(&Value::from("pain")))
                .expect("item exists");
            lists.toggle_favorite(&list_id, pain)?;
            let pain = ctx
                .docket()
                .access()?
                .get(&items_path(&list_id), pain.id())?
                .expect("item exists");
            assert_eq!(pain.get(IS_FAVORITE), Some(&Value::Bool(true)));

            let by_creation = ListView::new().process(&snapshot);
            let names: Vec<_> = by_creation.iter().filter_map(|d| d.get("field1")).cloned().collect();
            assert_eq!(names.len(), 3);

            let mut view = ListView::new();
            view.sort_mut().cycle("field1");
            assert_eq!(view.sort_mut().order(), Some(SortOrder::Ascending));
            let sorted: Vec<String> = view
                .process(&snapshot)
                .iter()
                .filter_map(|d| d.get("field1").map(|v| v.to_plain_string()))
                .collect();
            assert_eq!(sorted, vec!["Beurre", "lait", "pain"]);

            let desc = ListView::new().sort(SortState::by("field1", SortOrder::Descending));
            assert_eq!(desc.page(&snapshot, 1)[0].get("field1"), Some(&Value::from("pain")));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_csv_import_and_export() {
    run_test(
        || create_test_context(),
        |ctx| {
            let lists = ctx.docket().lists()?;
            let csv = "Titre,Année,Note\nAlien,1979,5\nBrazil,1985\n";
            let summary = lists.import_csv("films.csv", "u1", csv)?;
            assert_eq!(summary.name, "films");
            assert_eq!(summary.items, 2);

            let exported = lists.export_csv(&summary.list_id)?;
            let mut lines = exported.lines();
            assert_eq!(lines.next(), Some("Titre,Année,Note"));
            let rows: Vec<&str> = lines.collect();
            assert!(rows.contains(&"Alien,1979,5"));
            assert!(rows.contains(&"Brazil,1985,"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_json_backup_restores_into_new_list() {
    run_test(
        || create_test_context(),
        |ctx| {
            let lists = ctx.docket().lists()?;
            let list_id = lists.create_list(
                &ListMetadata::new("Vins", "u1")
                    .with_labels(&["Nom"])
                    .with_color("purple"),
            )?;
            lists.add_item(&list_id, fields! { field1: "Chablis", isFavorite: true })?;

            let backup = lists.export_json(&list_id)?;
            let parsed: serde_json::Value = serde_json::from_str(&backup).expect("valid json");
            assert_eq!(parsed["metadata"]["name"], "Vins");
            assert!(parsed["items"][0].get("id").is_none());

            let restored = lists.import_json("u9", &backup)?;
            assert_eq!(restored.name, "Vins (Import)");
            let metadata = lists.get_list(&restored.list_id)?.expect("list exists");
            assert_eq!(metadata.color, "purple");
            assert_eq!(metadata.user_id, "u9");
            assert!(!metadata.is_pinned);

            let items = ctx.docket().access()?.get_all(&items_path(&restored.list_id))?;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].get("field1"), Some(&Value::from("Chablis")));

            let err = lists.import_json("u9", r#"{"metadata": {}}"#).err().expect("invalid");
            assert_eq!(err.kind(), &ErrorKind::ValidationError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
