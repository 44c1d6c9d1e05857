use std::sync::Arc;

use server::index::AssetIndex;
use server::kind::{AssetKind, KeyRules};
use server::sync::{SyncJob, SyncReport};

use crate::common::{FailingBlobStore, GeneratorMode, Harness, PNG_BYTES, StaleIndex};

async fn seeded() -> Harness {
    let h = Harness::new(GeneratorMode::Png).await;
    for path in [
        "ingredients/ajo.jpg",
        "ingredients/Cebolla-Roja.png",
        "ingredients/notes.txt",
        "ingredients/sub/nested.jpg",
        "recipes/paella_valenciana.png",
        "users/u1/ingredients/private.jpg",
    ] {
        h.seed_blob(path, &PNG_BYTES).await;
    }
    h
}

#[tokio::test]
async fn first_run_inserts_and_second_run_is_a_no_op() {
    let h = seeded().await;

    let first = h.state.sync.sync_all().await;
    assert_eq!(
        first,
        SyncReport {
            inserted: 3,
            existing: 0,
            failed: 0
        }
    );

    let second = h.state.sync.sync_all().await;
    assert_eq!(
        second,
        SyncReport {
            inserted: 0,
            existing: 3,
            failed: 0
        }
    );
}

#[tokio::test]
async fn records_carry_pool_kind_and_path() {
    let h = seeded().await;
    h.state.sync.sync_all().await;

    let onion = h.index().find_exact("cebolla roja").await.unwrap().unwrap();
    assert_eq!(onion.kind, AssetKind::Ingredient);
    assert_eq!(onion.storage_path, "ingredients/Cebolla-Roja.png");
    assert_eq!(onion.public_url, h.url_for("ingredients/Cebolla-Roja.png"));

    let paella = h.index().find_exact("paella_valenciana").await.unwrap().unwrap();
    assert_eq!(paella.kind, AssetKind::Recipe);

    assert!(h.index().find_exact("private").await.unwrap().is_none());
    assert!(h.index().find_exact("nested").await.unwrap().is_none());
    assert!(h.index().find_exact("notes").await.unwrap().is_none());
}

#[tokio::test]
async fn existing_rows_are_left_untouched() {
    let h = seeded().await;
    let id = h
        .seed_record(
            "ajo",
            "ingredients/ajo.jpg",
            "https://cdn.test/ajo.jpg",
            AssetKind::Ingredient,
        )
        .await;

    let report = h.state.sync.sync_all().await;
    assert_eq!(report.inserted, 2);
    assert_eq!(report.existing, 1);

    let ajo = h.index().find_exact("ajo").await.unwrap().unwrap();
    assert_eq!(ajo.id, id);
    assert_eq!(ajo.public_url, "https://cdn.test/ajo.jpg");
}

#[tokio::test]
async fn unusable_file_names_are_counted_and_skipped() {
    let h = seeded().await;
    h.seed_blob("ingredients/___.png", &PNG_BYTES).await;

    let report = h.state.sync.sync_all().await;

    assert_eq!(report.inserted, 3);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn synced_rows_let_the_cache_reuse_other_formats() {
    let h = seeded().await;
    h.seed_blob("ingredients/pimiento.webp", b"RIFFwebp").await;
    h.state.sync.sync_all().await;

    let url = h.state.ingredients.get_or_generate("Pimiento", "u9", None).await;

    assert_eq!(h.generator.calls(), 0);
    assert!(url.ends_with(".webp"), "{url}");
}

#[tokio::test]
async fn listing_failures_do_not_abort_the_run() {
    let h = Harness::with_store(GeneratorMode::Png, |_| Arc::new(FailingBlobStore)).await;

    let report = h.state.sync.sync_all().await;

    assert_eq!(report.inserted, 0);
    assert_eq!(report.failed, 2);
}

#[tokio::test]
async fn long_recipe_file_names_use_the_bounded_recipe_key() {
    let h = Harness::new(GeneratorMode::Png).await;
    let title = "Slow Braised Short Ribs with Red Wine Reduction and Creamy Polenta";
    let path = "recipes/slow_braised_short_ribs_with_red_wine_reduction_and_creamy_polenta.webp";
    h.seed_blob(path, b"RIFFwebp").await;

    let report = h.state.sync.sync_all().await;
    assert_eq!(report.inserted, 1);

    let key = h.state.recipes.key_for(title);
    let record = h.index().find_exact(key.as_str()).await.unwrap().unwrap();
    assert_eq!(record.storage_path, path);

    let url = h.state.recipes.get_or_generate(title, None).await;
    assert_eq!(url, h.url_for(path));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn insert_lost_to_a_concurrent_sync_counts_as_existing() {
    let h = Harness::new(GeneratorMode::Png).await;
    h.seed_blob("ingredients/ajo.jpg", &PNG_BYTES).await;
    h.seed_record(
        "ajo",
        "ingredients/ajo.jpg",
        "https://cdn.test/ajo.jpg",
        AssetKind::Ingredient,
    )
    .await;
    let stale: Arc<dyn AssetIndex> = Arc::new(StaleIndex {
        inner: h.index().clone(),
    });
    let job = SyncJob::new(
        h.state.blobs.clone(),
        stale,
        vec![(AssetKind::Ingredient, "ingredients".to_string())],
        KeyRules::default(),
    );

    let report = job.sync_all().await;

    assert_eq!(
        report,
        SyncReport {
            inserted: 0,
            existing: 1,
            failed: 0
        }
    );
    let ajo = h.index().find_exact("ajo").await.unwrap().unwrap();
    assert_eq!(ajo.public_url, "https://cdn.test/ajo.jpg");
}
