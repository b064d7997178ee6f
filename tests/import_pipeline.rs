use card_api::config::ImportConfig;
use card_api::import::{CardImporter, ImportError};
use card_api::test_support::{MemoryCardStore, sample_card};
use indicatif::ProgressBar;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const HEADER: &str = "uuid,manaValue,manaCost,name,rarity,setCode,subtypes,text,type";

fn csv_file(header: &str, rows: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "{header}").expect("write header");
    for row in rows {
        writeln!(file, "{row}").expect("write row");
    }
    file.flush().expect("flush temp file");
    file
}

fn generated_rows(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("uuid-{i},{},{{W}},Card {i},common,TST,,Text {i}.,Instant", i % 5))
        .collect()
}

fn importer(batch_size: usize, max_rows: Option<usize>) -> CardImporter {
    CardImporter::new(
        ImportConfig::default()
            .with_batch_size(batch_size)
            .with_max_rows(max_rows),
    )
}

async fn import(
    importer: &CardImporter,
    path: &Path,
    store: &mut MemoryCardStore,
) -> Result<card_api::import::ImportSummary, ImportError> {
    importer
        .import_file(path, store, &ProgressBar::hidden())
        .await
}

#[tokio::test]
async fn imports_single_card_into_empty_store() {
    let file = csv_file(
        HEADER,
        &["abc-123,1,{W},TestCard,common,TST,,Draw a card.,Instant".to_string()],
    );
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.flushes, 1);
    let committed = store.committed();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].uuid, "abc-123");
    assert_eq!(committed[0].name, "TestCard");
    assert_eq!(committed[0].mana_value, 1.0);
    assert_eq!(committed[0].text.as_deref(), Some("Draw a card."));
    assert_eq!(committed[0].subtype, None);
    assert!(!store.in_transaction());
}

#[tokio::test]
async fn skips_cards_already_in_store() {
    let file = csv_file(
        HEADER,
        &["abc-123,1,{W},TestCard,common,TST,,Draw a card.,Instant".to_string()],
    );
    let mut store = MemoryCardStore::with_cards([sample_card("abc-123", "TestCard")]);

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.committed().len(), 1);
    assert_eq!(store.flush_count(), 0);
}

#[tokio::test]
async fn flushes_once_per_started_batch() {
    let file = csv_file(HEADER, &generated_rows(25));
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 25);
    assert_eq!(summary.flushes, 3);
    assert_eq!(store.flush_count(), 3);
    assert_eq!(store.committed().len(), 25);
}

#[tokio::test]
async fn exact_multiple_of_batch_size_needs_no_final_flush() {
    let file = csv_file(HEADER, &generated_rows(20));
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 20);
    assert_eq!(store.flush_count(), 2);
}

#[tokio::test]
async fn stops_at_row_cap() {
    let file = csv_file(HEADER, &generated_rows(25));
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, Some(15)), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.processed, 15);
    assert_eq!(summary.imported, 15);
    assert_eq!(store.flush_count(), 2);
    let uuids: Vec<&str> = store.committed().iter().map(|c| c.uuid.as_str()).collect();
    assert_eq!(uuids.first(), Some(&"uuid-0"));
    assert_eq!(uuids.last(), Some(&"uuid-14"));
}

#[tokio::test]
async fn default_cap_imports_a_single_batch() {
    let file = csv_file(HEADER, &generated_rows(12));
    let mut store = MemoryCardStore::new();
    let importer = CardImporter::new(ImportConfig::from_lookup(|key| {
        (key == "CARD_IMPORT_BATCH_SIZE").then(|| "5".to_string())
    }));

    let summary = import(&importer, file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.processed, 5);
    assert_eq!(store.committed().len(), 5);
}

#[tokio::test]
async fn skipped_rows_count_towards_the_cap() {
    let file = csv_file(HEADER, &generated_rows(6));
    let mut store = MemoryCardStore::with_cards([
        sample_card("uuid-0", "Card 0"),
        sample_card("uuid-1", "Card 1"),
    ]);

    let summary = import(&importer(10, Some(4)), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.imported, 2);
    assert_eq!(store.committed().len(), 4);
}

#[tokio::test]
async fn malformed_rows_are_skipped_without_aborting() {
    let mut rows = generated_rows(3);
    rows.insert(1, "broken-row,1".to_string());
    rows.push("bad-mana,many,{W},Odd,common,TST,,,Instant".to_string());
    let file = csv_file(HEADER, &rows);
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.failed, 2);
    assert!(store.committed().iter().all(|c| c.uuid.starts_with("uuid-")));
}

#[tokio::test]
async fn staging_rejection_only_fails_that_row() {
    let file = csv_file(HEADER, &generated_rows(3));
    let mut store = MemoryCardStore::new().rejecting("uuid-1");

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(store.committed().len(), 2);
}

#[tokio::test]
async fn duplicate_uuids_within_file_are_imported_once() {
    let mut rows = generated_rows(2);
    rows.push(rows[0].clone());
    let file = csv_file(HEADER, &rows);
    let mut store = MemoryCardStore::new();

    let summary = import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.committed().len(), 2);
}

#[tokio::test]
async fn rerunning_the_same_file_adds_nothing() {
    let file = csv_file(HEADER, &generated_rows(7));
    let mut store = MemoryCardStore::new();
    let importer = importer(3, None);

    let first = import(&importer, file.path(), &mut store)
        .await
        .expect("first import");
    let second = import(&importer, file.path(), &mut store)
        .await
        .expect("second import");

    assert_eq!(first.imported, 7);
    assert_eq!(second.imported, 0);
    assert_eq!(second.skipped, 7);
    assert_eq!(store.committed().len(), 7);
}

#[tokio::test]
async fn commit_failure_rolls_back_every_batch() {
    let file = csv_file(HEADER, &generated_rows(25));
    let mut store = MemoryCardStore::new().failing_commit();

    let result = import(&importer(10, None), file.path(), &mut store).await;

    assert!(matches!(result, Err(ImportError::Store(_))));
    assert!(store.committed().is_empty());
    assert_eq!(store.flush_count(), 3);
    assert!(!store.in_transaction());
}

#[tokio::test]
async fn flush_failure_aborts_the_run() {
    let file = csv_file(HEADER, &generated_rows(25));
    let mut store = MemoryCardStore::new().failing_flush(2);

    let result = import(&importer(10, None), file.path(), &mut store).await;

    assert!(matches!(result, Err(ImportError::Store(_))));
    assert!(store.committed().is_empty());
    assert!(!store.in_transaction());
}

#[tokio::test]
async fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = MemoryCardStore::new();

    let result = import(&importer(10, None), &dir.path().join("cards.csv"), &mut store).await;

    assert!(matches!(result, Err(ImportError::FileAccess { .. })));
    assert!(!store.in_transaction());
}

#[tokio::test]
async fn header_without_required_columns_is_fatal() {
    let file = csv_file("uuid,name", &["abc-123,TestCard".to_string()]);
    let mut store = MemoryCardStore::new();

    let result = import(&importer(10, None), file.path(), &mut store).await;

    assert!(matches!(result, Err(ImportError::MissingColumns(_))));
    assert!(store.committed().is_empty());
}

#[tokio::test]
async fn quoted_fields_keep_commas_and_escaped_newlines() {
    let file = csv_file(
        HEADER,
        &[r#"q-1,1.0,{U},"Opt, Again",common,TST,,"Scry 1.\nDraw a card.",Instant"#.to_string()],
    );
    let mut store = MemoryCardStore::new();

    import(&importer(10, None), file.path(), &mut store)
        .await
        .expect("import succeeds");

    let card = &store.committed()[0];
    assert_eq!(card.name, "Opt, Again");
    assert_eq!(card.text.as_deref(), Some("Scry 1.\\nDraw a card."));
}
