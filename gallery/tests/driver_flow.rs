use api_client::{MediaFile, MediaPage};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use gallery::{
    Command, DateFilter, DateMethod, Driver, Gallery, GalleryOptions, GroupBy, GroupKey, LocalZone,
    LoadState, MediaSource, Message, Orientation, OrientationSource, SourceError,
};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use store::MemoryStore;

struct FakeSource {
    pages: HashMap<Option<String>, MediaPage>,
    thumbnails: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
}

#[async_trait]
impl MediaSource for FakeSource {
    async fn fetch_page(&self, page_token: Option<&str>) -> Result<MediaPage, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(&page_token.map(String::from))
            .cloned()
            .ok_or_else(|| SourceError::Http {
                status: 500,
                message: "no such page".into(),
            })
    }

    async fn fetch_thumbnail(&self, file_id: &str) -> Result<Vec<u8>, SourceError> {
        self.thumbnails
            .get(file_id)
            .cloned()
            .ok_or_else(|| SourceError::Http {
                status: 404,
                message: "Not found".into(),
            })
    }
}

fn file(id: &str, created: &str, dims: Option<(u32, u32)>) -> MediaFile {
    MediaFile {
        id: id.into(),
        name: format!("{}.jpg", id),
        mime_type: "image/jpeg".into(),
        thumbnail_link: Some(format!("https://lh3.googleusercontent.com/{}=s220", id)),
        web_view_link: None,
        size: Some(2048),
        created_time: Some(
            DateTime::parse_from_rfc3339(created)
                .unwrap()
                .with_timezone(&Utc),
        ),
        width: dims.map(|d| d.0),
        height: dims.map(|d| d.1),
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn options(offset_hours: i32) -> GalleryOptions {
    GalleryOptions {
        local_zone: LocalZone::Fixed(FixedOffset::east_opt(offset_hours * 3600).unwrap()),
        today: NaiveDate::from_ymd_opt(2024, 3, 20),
        date_method: DateMethod::Local,
        group_by: GroupBy::Day,
    }
}

fn source() -> FakeSource {
    let mut pages = HashMap::new();
    pages.insert(
        None,
        MediaPage {
            files: vec![
                file("a", "2024-03-01T23:30:00Z", Some((800, 1200))),
                file("b", "2024-02-10T10:00:00Z", None),
            ],
            next_page_token: Some("p2".into()),
        },
    );
    pages.insert(
        Some("p2".into()),
        MediaPage {
            // "b" is delivered again and must not be duplicated.
            files: vec![
                file("b", "2024-02-10T10:00:00Z", None),
                file("c", "2023-12-24T08:00:00Z", Some((1000, 1000))),
            ],
            next_page_token: None,
        },
    );
    let mut thumbnails = HashMap::new();
    thumbnails.insert("b".to_string(), png(60, 30));
    FakeSource {
        pages,
        thumbnails,
        calls: AtomicUsize::new(0),
    }
}

#[tokio::test]
async fn test_scroll_through_all_pages() {
    let driver = Driver::new(source());
    let mut gallery = Gallery::new(MemoryStore::new(), options(2));

    driver.dispatch(&mut gallery, Message::Mount).await;
    assert_eq!(gallery.load_state(), LoadState::Idle);
    assert_eq!(gallery.files().len(), 2);

    driver.dispatch(&mut gallery, Message::SentinelVisible).await;
    assert_eq!(gallery.load_state(), LoadState::Exhausted);

    let ids: Vec<&str> = gallery.files().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    let unique: HashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());

    driver.dispatch(&mut gallery, Message::SentinelVisible).await;
    assert_eq!(driver.source().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_measurement_fills_missing_orientation() {
    let driver = Driver::new(source());
    let mut gallery = Gallery::new(MemoryStore::new(), options(0));
    driver.dispatch(&mut gallery, Message::Mount).await;

    let b = gallery.file("b").unwrap().clone();
    assert_eq!(
        gallery.orientation_of(&b),
        (Orientation::Landscape, OrientationSource::Measured)
    );
}

#[tokio::test]
async fn test_local_day_groups_follow_offset() {
    let driver = Driver::new(source());
    let mut gallery = Gallery::new(MemoryStore::new(), options(2));
    driver.dispatch(&mut gallery, Message::Mount).await;
    driver.dispatch(&mut gallery, Message::SentinelVisible).await;

    let panels = gallery.panels();
    let labels: Vec<String> = panels.images.iter().map(|g| g.key.label()).collect();
    assert_eq!(labels, vec!["2024-03-02", "2024-02-10", "2023-12-24"]);

    gallery.update(Message::SetDateMethod(DateMethod::Utc));
    let panels = gallery.panels();
    assert_eq!(
        panels.images[0].key,
        GroupKey::Day(NaiveDate::from_ymd_opt(2024, 3, 1))
    );

    gallery.update(Message::SetDateFilter(Some(DateFilter::ThisMonth)));
    assert_eq!(gallery.panels().len(), 1);
    gallery.update(Message::SetDateFilter(Some(DateFilter::LastYear)));
    assert_eq!(gallery.visible_tiles()[0].file.id, "c");

    gallery.update(Message::SetDateFilter(None));
    gallery.update(Message::SetGroupBy(GroupBy::Orientation));
    gallery.update(Message::SetOrientationFilter(Some(Orientation::Square)));
    let panels = gallery.panels();
    assert_eq!(panels.len(), 1);
    assert_eq!(panels.images[0].key, GroupKey::Orientation(Orientation::Square));
}

#[tokio::test]
async fn test_page_error_becomes_banner() {
    let mut fake = source();
    fake.pages.remove(&Some("p2".to_string()));
    let driver = Driver::new(fake);
    let mut gallery = Gallery::new(MemoryStore::new(), options(0));

    driver.dispatch(&mut gallery, Message::Mount).await;
    driver.dispatch(&mut gallery, Message::SentinelVisible).await;
    assert_eq!(gallery.errors().len(), 1);
    assert!(gallery.errors()[0].contains("no such page"));
    assert_eq!(gallery.load_state(), LoadState::Idle);
    assert_eq!(gallery.files().len(), 2);
}

#[tokio::test]
async fn test_batch_runs_in_order() {
    let driver = Driver::new(source());
    let mut gallery = Gallery::new(MemoryStore::new(), options(0));
    let first = gallery.update(Message::Mount);
    driver
        .run(&mut gallery, Command::batch(vec![Command::None, first]))
        .await;
    assert_eq!(gallery.files().len(), 2);
}
