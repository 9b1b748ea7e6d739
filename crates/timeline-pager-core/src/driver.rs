// Reactive timeline driver
//
// Runs on a single task. Viewport requests and fetch completions are handled
// one at a time through `&mut self`, so the session needs no locking. Page
// fetches are pushed into a `FuturesUnordered` and never awaited inline: the
// caller stays free to issue new viewport requests while pages are in flight.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::collection::MergeStats;
use crate::entry::{Batch, Edge};
use crate::error::{Result, TimelineError};
use crate::planner::{FetchPlan, PlannerOptions, ViewportFetchPlanner};
use crate::session::TimelineSession;
use crate::slice::TimelineSlice;
use crate::source::{TimelineFilters, TimelineSource};

/// Commands accepted by [`TimelineDriver::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    RequestViewport(TimelineSlice),
    SetFilters(TimelineFilters),
}

/// A page fetch that resolved successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub offset: u64,
    /// `None` when the page belonged to a previous session and was dropped.
    pub merged: Option<MergeStats>,
    /// Plan for the last requested viewport after merging.
    pub next: FetchPlan,
}

/// Cloneable sender for a driver running under [`TimelineDriver::run`]
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<DriverCommand>,
}

impl DriverHandle {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DriverCommand>) {
        let (commands, rx) = mpsc::channel(capacity);
        (Self { commands }, rx)
    }

    pub async fn request_viewport(&self, slice: TimelineSlice) -> Result<()> {
        self.send(DriverCommand::RequestViewport(slice)).await
    }

    pub async fn set_filters(&self, filters: TimelineFilters) -> Result<()> {
        self.send(DriverCommand::SetFilters(filters)).await
    }

    async fn send(&self, command: DriverCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TimelineError::session_closed())
    }
}

struct FetchOutcome {
    generation: u64,
    offset: u64,
    result: Result<Batch>,
}

enum Event {
    Command(Option<DriverCommand>),
    Fetched(FetchOutcome),
}

pub struct TimelineDriver<S: TimelineSource + 'static> {
    source: Arc<S>,
    session: TimelineSession,
    planner: ViewportFetchPlanner,
    requested: Option<TimelineSlice>,
    pending: FuturesUnordered<BoxFuture<'static, FetchOutcome>>,
    /// Fetches in `pending` issued for the current generation.
    current_pending: usize,
    loaded: bool,
    visible_tx: watch::Sender<Vec<Edge>>,
    total_tx: watch::Sender<u64>,
    loading_tx: watch::Sender<bool>,
}

impl<S: TimelineSource + 'static> TimelineDriver<S> {
    pub fn new(source: Arc<S>, options: PlannerOptions) -> Self {
        let (visible_tx, _) = watch::channel(Vec::new());
        let (total_tx, _) = watch::channel(0);
        let (loading_tx, _) = watch::channel(false);

        Self {
            source,
            session: TimelineSession::default(),
            planner: ViewportFetchPlanner::new(options),
            requested: None,
            pending: FuturesUnordered::new(),
            current_pending: 0,
            loaded: false,
            visible_tx,
            total_tx,
            loading_tx,
        }
    }

    pub fn session(&self) -> &TimelineSession {
        &self.session
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn requested_viewport(&self) -> Option<&TimelineSlice> {
        self.requested.as_ref()
    }

    /// Page fetches issued for the current session and not yet resolved.
    /// Fetches left over from a previous filter set are not counted.
    pub fn in_flight(&self) -> usize {
        self.current_pending
    }

    pub fn observe_visible_entries(&self) -> watch::Receiver<Vec<Edge>> {
        self.visible_tx.subscribe()
    }

    pub fn observe_total_count(&self) -> watch::Receiver<u64> {
        self.total_tx.subscribe()
    }

    pub fn observe_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    /// Load the timeline for `filters`.
    ///
    /// A different filter set (or the first load) discards the cached
    /// session before fetching. A refresh with the same filters keeps the
    /// cache and merges the first page into it.
    pub async fn load(&mut self, filters: TimelineFilters) -> Result<()> {
        if !self.loaded || *self.session.filters() != filters {
            self.session.reset(filters);
            self.planner.reset();
            self.current_pending = 0;
            self.publish();
        }

        self.session.set_loading(true);
        self.publish_loading();

        let result = self.source.fetch_view(self.session.filters()).await;
        self.session.set_loading(false);

        match result {
            Ok(view) => {
                self.session.apply_view(view);
                self.loaded = true;
                self.reevaluate();
                self.publish();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Failed to load timeline view");
                self.publish_loading();
                Err(err)
            }
        }
    }

    /// Declare the range of entries currently needed.
    ///
    /// Issues at most one page fetch and returns immediately.
    pub fn request_viewport(&mut self, slice: TimelineSlice) -> FetchPlan {
        debug!(viewport = %slice, "Viewport requested");
        self.requested = Some(slice);
        let plan = self.reevaluate();
        self.publish();
        plan
    }

    /// Wait for the next in-flight page fetch to resolve and apply it.
    ///
    /// Stale fetches from a previous session are drained here too and come
    /// back with `merged: None`. Returns `None` once no fetch of any session
    /// is pending. A failed fetch leaves the
    /// collection untouched and its error is handed back to the caller.
    pub async fn next_completion(&mut self) -> Option<Result<Completion>> {
        let outcome = self.pending.next().await?;
        Some(self.complete(outcome))
    }

    /// Drive completions until nothing is in flight, stopping at the first error.
    pub async fn settle(&mut self) -> Result<()> {
        while let Some(result) = self.next_completion().await {
            result?;
        }
        Ok(())
    }

    /// Event loop: apply commands and fetch completions until the command
    /// channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<DriverCommand>) -> Result<()> {
        info!("Timeline driver started");
        loop {
            let has_pending = !self.pending.is_empty();
            let event = tokio::select! {
                Some(outcome) = self.pending.next(), if has_pending => Event::Fetched(outcome),
                command = commands.recv() => Event::Command(command),
            };

            match event {
                Event::Fetched(outcome) => {
                    if let Err(err) = self.complete(outcome) {
                        // Surfaced to the UI through logs; the loop keeps going.
                        warn!(error = %err, "Timeline page fetch failed");
                    }
                }
                Event::Command(Some(DriverCommand::RequestViewport(slice))) => {
                    self.request_viewport(slice);
                }
                Event::Command(Some(DriverCommand::SetFilters(filters))) => {
                    if let Err(err) = self.load(filters).await {
                        warn!(error = %err, "Timeline reload failed");
                    }
                }
                Event::Command(None) => break,
            }
        }
        info!(in_flight = self.pending.len(), "Timeline driver stopped");
        Ok(())
    }

    fn complete(&mut self, outcome: FetchOutcome) -> Result<Completion> {
        let FetchOutcome {
            generation,
            offset,
            result,
        } = outcome;
        let current = generation == self.session.generation();
        if current {
            self.current_pending = self.current_pending.saturating_sub(1);
        }

        let batch = match result {
            Ok(batch) => batch,
            Err(err) => {
                if current {
                    self.planner.mark_failed(offset);
                }
                self.publish_loading();
                return Err(err);
            }
        };

        let merged = self.session.merge_page(generation, batch);
        if current {
            self.planner.mark_completed(offset);
        }
        let next = self.reevaluate();
        self.publish();

        Ok(Completion {
            offset,
            merged,
            next,
        })
    }

    /// Re-run the planner for the last requested viewport and issue a fetch
    /// when it asks for one.
    fn reevaluate(&mut self) -> FetchPlan {
        let Some(slice) = self.requested else {
            return FetchPlan::Idle;
        };
        let plan = self.planner.evaluate(
            self.session.collection(),
            self.session.total_count(),
            &slice,
        );
        if let FetchPlan::Fetch(offset) = plan {
            self.spawn_fetch(offset);
        }
        plan
    }

    fn spawn_fetch(&mut self, offset: u64) {
        let source = Arc::clone(&self.source);
        let filters = self.session.filters().clone();
        let generation = self.session.generation();
        debug!(offset, generation, "Issuing timeline page fetch");
        self.current_pending += 1;

        self.pending.push(Box::pin(async move {
            let result = source.fetch_page(&filters, offset).await;
            FetchOutcome {
                generation,
                offset,
                result,
            }
        }));
    }

    fn publish(&self) {
        let visible = match &self.requested {
            Some(slice) => self.session.visible_entries(slice),
            None => Vec::new(),
        };
        self.visible_tx.send_replace(visible);
        self.total_tx.send_if_modified(|total| {
            let next = self.session.total_count();
            let changed = *total != next;
            *total = next;
            changed
        });
        self.publish_loading();
    }

    fn publish_loading(&self) {
        let loading = self.session.loading() || self.current_pending > 0;
        self.loading_tx.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }
}
