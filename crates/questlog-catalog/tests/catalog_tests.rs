//! Integration tests for the catalog against an on-disk store

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use questlog_catalog::{
    CatalogContext, CatalogError, GameFields, ListFilter, RecordStore, cover_dimensions,
    default_export_file_name,
};
use questlog_config::QuestlogConfig;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary data directory with a configured context
struct CatalogTestEnv {
    #[allow(dead_code)]
    temp_dir: TempDir,
    db_path: PathBuf,
    backup_dir: PathBuf,
}

impl CatalogTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("questlog.db");
        let backup_dir = temp_dir.path().join("backups");
        std::fs::create_dir_all(&backup_dir).expect("Failed to create backup directory");

        Self {
            temp_dir,
            db_path,
            backup_dir,
        }
    }

    fn context(&self) -> CatalogContext {
        let mut config = QuestlogConfig::default();
        config.storage.path = self.db_path.clone();
        CatalogContext::new(config)
    }
}

fn cover(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([30, 30, 30]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

fn fields(title: &str, platform: &str, play_date: &str) -> GameFields {
    GameFields {
        title: title.to_string(),
        platform: platform.to_string(),
        release_date: "2020-11-10".to_string(),
        play_date: play_date.to_string(),
        rating: 8,
        review: String::new(),
    }
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let env = CatalogTestEnv::new();

    let added = {
        let context = env.context();
        let catalog = context.catalog().await.unwrap();
        catalog
            .add_record(
                fields("Astro Bot", "PS5", "2024-10-01"),
                Some(cover(32, 32, ImageFormat::Png)),
            )
            .await
            .unwrap()
    };

    let reopened = RecordStore::open(&env.db_path).await.unwrap();
    assert_eq!(reopened.read_all().await.unwrap(), vec![added]);
}

#[tokio::test]
async fn test_large_cover_is_bounded() {
    let env = CatalogTestEnv::new();
    let catalog = env.context().catalog().await.unwrap();

    let added = catalog
        .add_record(
            fields("Elden Ring", "PC", "2022-04-30"),
            Some(cover(1600, 900, ImageFormat::Jpeg)),
        )
        .await
        .unwrap();

    assert!(added.cover.starts_with("data:image/png;base64,"));
    assert_eq!(cover_dimensions(&added.cover).unwrap(), (800, 450));
}

#[tokio::test]
async fn test_add_update_delete_cycle() {
    let env = CatalogTestEnv::new();
    let catalog = env.context().catalog().await.unwrap();

    let a = catalog
        .add_record(fields("A", "PC", "2021-01-01"), Some(cover(8, 8, ImageFormat::Png)))
        .await
        .unwrap();
    let b = catalog
        .add_record(fields("B", "PC", ""), Some(cover(8, 8, ImageFormat::Png)))
        .await
        .unwrap();
    assert_eq!(catalog.read_all().await.unwrap().len(), 2);

    let updated = catalog
        .update_record(b.id, fields("B (finished)", "PC", "2022-02-02"), None)
        .await
        .unwrap();
    assert_eq!(updated.id, b.id);
    assert_eq!(updated.cover, b.cover);
    assert_eq!(catalog.read_all().await.unwrap().len(), 2);

    catalog.delete_record(a.id).await.unwrap();
    catalog.delete_record(a.id).await.unwrap();
    assert_eq!(catalog.read_all().await.unwrap(), vec![updated]);
}

#[tokio::test]
async fn test_backup_round_trip_through_file() {
    let env = CatalogTestEnv::new();
    let catalog = env.context().catalog().await.unwrap();

    for (title, platform, play_date) in [
        ("Hollow Knight", "Switch", "2019-08-01"),
        ("Disco Elysium", "PC", "2020-03-15"),
        ("Pentiment", "Xbox", ""),
    ] {
        catalog
            .add_record(fields(title, platform, play_date), Some(cover(8, 8, ImageFormat::Png)))
            .await
            .unwrap();
    }
    let mut before = catalog.read_all().await.unwrap();

    let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let path = env.backup_dir.join(default_export_file_name(date));
    assert_eq!(catalog.export_to_file(&path).await.unwrap(), 3);

    catalog.import("[]").await.unwrap();
    assert!(catalog.read_all().await.unwrap().is_empty());

    assert_eq!(catalog.import_from_file(&path).await.unwrap(), 3);
    let mut after = catalog.read_all().await.unwrap();

    before.sort_by_key(|r| r.id);
    after.sort_by_key(|r| r.id);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_import_failures_leave_collection_alone() {
    let env = CatalogTestEnv::new();
    let catalog = env.context().catalog().await.unwrap();
    let kept = catalog
        .add_record(fields("Kept", "PC", "2020-01-01"), Some(cover(8, 8, ImageFormat::Png)))
        .await
        .unwrap();

    let err = catalog.import("{ not json").await.unwrap_err();
    assert!(matches!(err, CatalogError::Import(_)));

    // Parses fine but repeats an id, so the write is rolled back
    let duplicate = r#"[
        {"id":1,"title":"X","cover":"c","releaseDate":"2020-01-01","platform":"PC","rating":5},
        {"id":1,"title":"Y","cover":"c","releaseDate":"2020-01-01","platform":"PC","rating":5}
    ]"#;
    let err = catalog.import(duplicate).await.unwrap_err();
    assert!(matches!(err, CatalogError::Write(_)));

    let missing = env.backup_dir.join("absent.json");
    let err = catalog.import_from_file(&missing).await.unwrap_err();
    assert!(matches!(err, CatalogError::Import(_)));

    assert_eq!(catalog.read_all().await.unwrap(), vec![kept]);
}

#[tokio::test]
async fn test_import_legacy_browser_export() {
    let env = CatalogTestEnv::new();
    let catalog = env.context().catalog().await.unwrap();

    let legacy = r#"[
        {"id":1700000000001,"title":"Celeste","cover":"data:image/png;base64,AA==",
         "playDate":"2022-05-05","releaseDate":"2018-01-25","platform":"Switch","rating":"9","review":"Strawberries"},
        {"id":1700000000002,"title":"Outer Wilds","cover":"data:image/png;base64,AA==",
         "playDate":"","releaseDate":"2019-05-28","platform":"PC","rating":"10","review":""}
    ]"#;
    assert_eq!(catalog.import(legacy).await.unwrap(), 2);

    let filter = ListFilter::default().with_year(2022).with_unfinished(true);
    let listed: Vec<String> = catalog
        .list_records(&filter)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(listed, vec!["Celeste", "Outer Wilds"]);

    let options = catalog.filter_options().await.unwrap();
    assert_eq!(options.years, vec![2022]);
    assert_eq!(options.platforms, vec!["PC", "Switch"]);
}
