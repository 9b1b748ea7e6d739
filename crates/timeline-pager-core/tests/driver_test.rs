// Integration tests for the timeline driver
//
// Drives the full loop: view load, viewport requests, page fetches and
// merges, against in-memory sources.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use timeline_pager_core::{
    Batch, BatchEdge, EntryKind, FetchPlan, MemorySource, MonthBucket, PlannerOptions,
    TimelineDistribution, TimelineDriver, TimelineEntry, TimelineFilters, TimelineSlice,
    TimelineSource, TimelineView, YearBucket,
};
use timeline_pager_core::{DriverHandle, Result};

/// `count` entries, one per day going back from 2024-06-30, alternating
/// image and video. Index `i` is entry `e{i}`.
fn entries(count: u64) -> Vec<TimelineEntry> {
    let base = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    (0..count)
        .map(|i| TimelineEntry {
            id: Some(format!("e{}", i)),
            kind: Some(if i % 2 == 0 {
                EntryKind::Image
            } else {
                EntryKind::Video
            }),
            date: base.checked_sub_days(Days::new(i)),
            ..Default::default()
        })
        .collect()
}

fn memory_driver(count: u64, page_size: usize) -> TimelineDriver<MemorySource> {
    let source = MemorySource::new(entries(count)).with_page_size(page_size);
    TimelineDriver::new(Arc::new(source), PlannerOptions::default())
}

fn cached_indices<S: TimelineSource>(driver: &TimelineDriver<S>) -> Vec<u64> {
    driver
        .session()
        .collection()
        .edges()
        .iter()
        .map(|edge| edge.index)
        .collect()
}

/// Source whose initial view carries only the distribution, so every entry
/// has to be paged in.
struct CountOnlySource {
    total: u64,
    page_size: u64,
}

#[async_trait]
impl TimelineSource for CountOnlySource {
    async fn fetch_view(&self, _filters: &TimelineFilters) -> Result<TimelineView> {
        Ok(TimelineView {
            distribution: TimelineDistribution::new(vec![YearBucket {
                year: 2024,
                month_distribution: vec![MonthBucket {
                    month: 6,
                    total_entry_count: Some(self.total),
                }],
            }]),
            entries: Vec::new(),
        })
    }

    async fn fetch_page(&self, _filters: &TimelineFilters, offset: u64) -> Result<Batch> {
        let end = (offset + self.page_size).min(self.total);
        Ok((offset..end)
            .map(|i| {
                BatchEdge::new(
                    i,
                    TimelineEntry {
                        id: Some(format!("e{}", i)),
                        ..Default::default()
                    },
                )
            })
            .collect())
    }
}

#[tokio::test]
async fn test_single_page_fills_viewport() {
    let source = Arc::new(CountOnlySource {
        total: 20,
        page_size: 10,
    });
    let mut driver = TimelineDriver::new(source, PlannerOptions::default());
    driver.load(TimelineFilters::default()).await.unwrap();

    assert_eq!(driver.session().total_count(), 20);
    assert!(driver.session().collection().is_empty());

    let plan = driver.request_viewport(TimelineSlice::new(0, 9));
    assert_eq!(plan, FetchPlan::Fetch(0));
    assert_eq!(driver.in_flight(), 1);

    let completion = driver.next_completion().await.unwrap().unwrap();
    assert_eq!(completion.offset, 0);
    assert_eq!(completion.merged.unwrap().inserted, 10);
    assert_eq!(completion.next, FetchPlan::Covered);

    assert_eq!(
        driver.request_viewport(TimelineSlice::new(0, 9)),
        FetchPlan::Covered
    );
    assert_eq!(driver.in_flight(), 0);
    assert!(driver.next_completion().await.is_none());
}

#[tokio::test]
async fn test_viewport_is_paged_in_until_covered() {
    let mut driver = memory_driver(50, 5);
    driver.load(TimelineFilters::default()).await.unwrap();
    assert_eq!(cached_indices(&driver), (0..5).collect::<Vec<_>>());

    assert_eq!(
        driver.request_viewport(TimelineSlice::new(10, 24)),
        FetchPlan::Fetch(10)
    );
    driver.settle().await.unwrap();

    assert_eq!(driver.source().requested_offsets(), vec![10, 15, 20]);
    let mut expected: Vec<u64> = (0..5).collect();
    expected.extend(10..25);
    assert_eq!(cached_indices(&driver), expected);
}

#[tokio::test]
async fn test_clamped_viewport_stops_at_timeline_end() {
    let mut driver = memory_driver(12, 5);
    driver.load(TimelineFilters::default()).await.unwrap();

    driver.request_viewport(TimelineSlice::new(-5, 1000));
    driver.settle().await.unwrap();

    assert_eq!(driver.source().requested_offsets(), vec![5, 10]);
    assert_eq!(cached_indices(&driver), (0..12).collect::<Vec<_>>());
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(-5, 1000)),
        FetchPlan::Covered
    );
}

#[tokio::test]
async fn test_moving_viewport_does_not_duplicate_in_flight_fetches() {
    let mut driver = memory_driver(100, 10);
    driver.load(TimelineFilters::default()).await.unwrap();

    assert_eq!(
        driver.request_viewport(TimelineSlice::new(20, 29)),
        FetchPlan::Fetch(20)
    );
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(50, 59)),
        FetchPlan::Fetch(50)
    );
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(20, 29)),
        FetchPlan::Suppressed(20)
    );
    assert_eq!(driver.in_flight(), 2);

    driver.settle().await.unwrap();

    let mut offsets = driver.source().requested_offsets();
    offsets.sort_unstable();
    assert_eq!(offsets, vec![20, 50]);
    assert!(driver.session().collection().contains_range(20, 29));
    assert!(driver.session().collection().contains_range(50, 59));
}

#[tokio::test]
async fn test_failed_fetch_keeps_cache_and_can_retry() {
    let source = MemorySource::new(entries(30))
        .with_page_size(10)
        .fail_offsets([10]);
    let mut driver = TimelineDriver::new(Arc::new(source), PlannerOptions::default());
    driver.load(TimelineFilters::default()).await.unwrap();

    assert_eq!(
        driver.request_viewport(TimelineSlice::new(10, 19)),
        FetchPlan::Fetch(10)
    );
    let err = driver.next_completion().await.unwrap().unwrap_err();
    assert_eq!(err.code(), "E001");
    assert_eq!(cached_indices(&driver), (0..10).collect::<Vec<_>>());
    assert!(!*driver.observe_loading().borrow());

    // The failed offset is forgotten, so the next request retries it.
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(10, 19)),
        FetchPlan::Fetch(10)
    );
    assert!(driver.settle().await.is_err());
    assert_eq!(driver.source().requested_offsets(), vec![10, 10]);
}

#[tokio::test]
async fn test_filter_change_discards_pages_from_previous_session() {
    let mut driver = memory_driver(40, 10);
    driver.load(TimelineFilters::default()).await.unwrap();
    assert_eq!(driver.session().total_count(), 40);

    // Issued for the unfiltered timeline, still unresolved when filters change.
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(10, 19)),
        FetchPlan::Fetch(10)
    );

    let images = TimelineFilters {
        kinds: vec![EntryKind::Image],
        ..Default::default()
    };
    driver.load(images).await.unwrap();
    assert_eq!(driver.session().total_count(), 20);

    driver.settle().await.unwrap();

    let collection = driver.session().collection();
    assert_eq!(collection.len(), 20);
    assert!(collection
        .edges()
        .iter()
        .all(|edge| edge.node.kind == Some(EntryKind::Image)));
}

#[tokio::test(start_paused = true)]
async fn test_stale_fetch_does_not_count_as_loading_after_reload() {
    let source = MemorySource::new(entries(40))
        .with_page_size(10)
        .with_latency(Duration::from_millis(50));
    let mut driver = TimelineDriver::new(Arc::new(source), PlannerOptions::default());
    let loading = driver.observe_loading();
    driver.load(TimelineFilters::default()).await.unwrap();

    assert_eq!(
        driver.request_viewport(TimelineSlice::new(30, 39)),
        FetchPlan::Fetch(30)
    );
    assert!(*loading.borrow());

    let images = TimelineFilters {
        kinds: vec![EntryKind::Image],
        ..Default::default()
    };
    driver.load(images).await.unwrap();
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(0, 9)),
        FetchPlan::Covered
    );
    assert_eq!(driver.in_flight(), 0);
    assert!(!*loading.borrow());

    // The old page still resolves, but is dropped and changes nothing.
    let completion = driver.next_completion().await.unwrap().unwrap();
    assert_eq!(completion.offset, 30);
    assert_eq!(completion.merged, None);
    assert!(!*loading.borrow());
    assert!(driver.next_completion().await.is_none());
}

#[tokio::test]
async fn test_failed_view_load_leaves_empty_session() {
    let source = MemorySource::new(entries(20)).fail_view();
    let mut driver = TimelineDriver::new(Arc::new(source), PlannerOptions::default());
    let loading = driver.observe_loading();
    let total = driver.observe_total_count();

    let err = driver.load(TimelineFilters::default()).await.unwrap_err();
    assert_eq!(err.code(), "E001");
    assert!(!*loading.borrow());
    assert_eq!(*total.borrow(), 0);
    assert!(driver.session().collection().is_empty());
    assert_eq!(
        driver.request_viewport(TimelineSlice::new(0, 9)),
        FetchPlan::Idle
    );
}

#[tokio::test]
async fn test_observers_follow_session_state() {
    let mut driver = memory_driver(30, 10);
    let total = driver.observe_total_count();
    let loading = driver.observe_loading();
    let visible = driver.observe_visible_entries();

    assert_eq!(*total.borrow(), 0);
    driver.load(TimelineFilters::default()).await.unwrap();
    assert_eq!(*total.borrow(), 30);
    assert!(!*loading.borrow());

    driver.request_viewport(TimelineSlice::new(5, 14));
    assert!(*loading.borrow());
    assert_eq!(visible.borrow().len(), 5);

    driver.settle().await.unwrap();
    assert!(!*loading.borrow());
    let indices: Vec<u64> = visible.borrow().iter().map(|edge| edge.index).collect();
    assert_eq!(indices, (5..15).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_processes_commands_and_completions() {
    let source = MemorySource::new(entries(60))
        .with_page_size(10)
        .with_latency(Duration::from_millis(50));
    let source = Arc::new(source);
    let driver = TimelineDriver::new(Arc::clone(&source), PlannerOptions::default());
    let mut visible = driver.observe_visible_entries();

    let (commands, rx) = DriverHandle::channel(8);
    let task = tokio::spawn(driver.run(rx));

    commands
        .set_filters(TimelineFilters::default())
        .await
        .unwrap();
    commands
        .request_viewport(TimelineSlice::new(0, 30))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while visible.borrow_and_update().len() < 31 {
            visible.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    drop(commands);
    task.await.unwrap().unwrap();
    assert_eq!(source.requested_offsets(), vec![10, 20, 30]);
}

#[tokio::test]
async fn test_handle_reports_stopped_driver() {
    let (commands, rx) = DriverHandle::channel(1);
    drop(rx);

    let err = commands
        .request_viewport(TimelineSlice::new(0, 9))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E003");
    assert!(commands
        .set_filters(TimelineFilters::default())
        .await
        .is_err());
}

#[tokio::test]
async fn test_leading_gap_is_filled_when_enabled() {
    let source = Arc::new(CountOnlySource {
        total: 40,
        page_size: 5,
    });
    let options = PlannerOptions {
        fill_leading_gap: true,
        ..Default::default()
    };
    let mut driver = TimelineDriver::new(source, options);
    driver.load(TimelineFilters::default()).await.unwrap();

    driver.request_viewport(TimelineSlice::new(20, 24));
    driver.settle().await.unwrap();
    driver.request_viewport(TimelineSlice::new(15, 24));
    driver.settle().await.unwrap();

    assert!(driver.session().collection().contains_range(15, 24));
}
