// CLI subcommands
//
// `replay` drives the engine against a fixture one viewport at a time and
// reports what each viewport cost in page fetches. `summary` prints the
// distribution the fixture produces.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use timeline_pager_config::{PagerConfig, RuntimeConfig};
use timeline_pager_core::{
    Edge, MemorySource, PlannerOptions, TimelineDistribution, TimelineDriver, TimelineFilters,
    TimelineSlice, TimelineSource,
};
use tracing::{info, warn};

/// One output line per replayed viewport
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportReport {
    pub viewport: String,
    pub total_count: u64,
    pub fetched_offsets: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub entries: Vec<Edge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub total_count: u64,
    pub distribution: TimelineDistribution,
}

pub fn planner_options(config: &PagerConfig) -> PlannerOptions {
    PlannerOptions {
        dedup_in_flight: config.dedup_in_flight,
        fill_leading_gap: config.fill_leading_gap,
    }
}

fn load_source(fixture: &Path, config: &RuntimeConfig) -> Result<MemorySource> {
    let source = MemorySource::from_path(fixture)
        .with_context(|| format!("Failed to load fixture {}", fixture.display()))?
        .with_page_size(config.source.page_size)
        .with_latency(config.source.latency());
    Ok(source)
}

pub async fn replay<W: Write>(
    config: &RuntimeConfig,
    fixture: &Path,
    filters: TimelineFilters,
    viewports: &[TimelineSlice],
    out: &mut W,
) -> Result<()> {
    let source = Arc::new(load_source(fixture, config)?);
    let mut driver = TimelineDriver::new(Arc::clone(&source), planner_options(&config.pager));

    driver
        .load(filters)
        .await
        .context("Failed to load timeline view")?;
    info!(
        total_count = driver.session().total_count(),
        cached = driver.session().collection().len(),
        "Timeline loaded"
    );

    for slice in viewports {
        let served = source.requested_offsets().len();
        driver.request_viewport(*slice);

        let mut errors = Vec::new();
        while let Some(result) = driver.next_completion().await {
            if let Err(err) = result {
                warn!(viewport = %slice, error = %err, "Page fetch failed during replay");
                errors.push(err.to_string());
            }
        }

        let report = ViewportReport {
            viewport: slice.to_string(),
            total_count: driver.session().total_count(),
            fetched_offsets: source.requested_offsets().split_off(served),
            errors,
            entries: driver.session().visible_entries(slice),
        };
        serde_json::to_writer(&mut *out, &report).context("Failed to serialize report")?;
        writeln!(out)?;
    }

    Ok(())
}

pub async fn summary<W: Write>(
    config: &RuntimeConfig,
    fixture: &Path,
    filters: TimelineFilters,
    out: &mut W,
) -> Result<()> {
    let source = load_source(fixture, config)?;
    let view = source
        .fetch_view(&filters)
        .await
        .context("Failed to load timeline view")?;

    let report = SummaryReport {
        total_count: view.distribution.total_count(),
        distribution: view.distribution,
    };
    serde_json::to_writer(&mut *out, &report).context("Failed to serialize summary")?;
    writeln!(out)?;
    Ok(())
}
