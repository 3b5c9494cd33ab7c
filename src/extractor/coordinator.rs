//! Harvest coordinator - the end-to-end pipeline
//!
//! This module contains the state machine that drives a run:
//! - Restoring the last checkpoint
//! - Enumerating work items from the input rows and repository listings
//! - Scheduling one scrape job per work item under the concurrency limit
//! - Snapshotting progress as jobs finish
//! - Mapping cached text onto the input rows and writing the output columns

use crate::browser::{page_markup, Browser, LoadState, Page, TargetDescriptor};
use crate::checkpoint::{CacheKey, CheckpointManager, PipelineState, SharedState};
use crate::config::{CourseCatalog, ExtractionConfig};
use crate::extractor::index::{navigate_within, DocumentIndex};
use crate::extractor::scheduler::{ConcurrencyScheduler, SchedulerReport};
use crate::extractor::sections::{parse_teaching_point, ScrapedUnit};
use crate::resolver::{Action, ElementResolver, ResolverConfig};
use crate::state::{RunPhase, WorkItem, WorkKey};
use crate::storage::{InputRow, OutputColumn, OutputRow, TabularStore};
use crate::text::parse_synopsis;
use crate::HarvestError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Structural path of the rendered case document
const DOCUMENT_BODY_PATH: &str = "div.doc-body.full-display-mode";

/// Structural path of the document view mode control
const VIEW_MODE_PATH: &str = "select.doc-controls-select.doc-controls-view-mode";

/// View mode that renders the whole case document
const FULL_VIEW_MODE: &str = "full";

/// Summary of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Jobs that extracted everything they were asked for
    pub succeeded: usize,

    /// Jobs that ended in an error or a panic
    pub failed: usize,

    /// Output cells left out because the cache had no value for them
    pub omitted: usize,

    /// Input rows whose work item was already processed by an earlier run
    pub skipped: usize,
}

/// Work produced by the enumerate phase
#[derive(Debug, Default)]
struct Enumeration {
    rows: Vec<InputRow>,
    items: Vec<WorkItem>,
    skipped: usize,
}

/// Cells produced by the map phase
#[derive(Debug, Default)]
struct MappedOutput {
    synopses: Vec<OutputRow>,
    teaching_points: Vec<OutputRow>,
    omitted: usize,
}

/// Everything a scrape job needs, cloned into each spawned task
#[derive(Clone)]
struct JobContext {
    browser: Arc<dyn Browser>,
    resolver: Arc<ElementResolver>,
    state: SharedState,
    checkpoints: Arc<CheckpointManager>,
    navigation_timeout: Duration,
    checkpoint_interval: usize,
    finished: Arc<AtomicUsize>,
    total: usize,
}

fn lock_state(state: &Mutex<PipelineState>) -> std::sync::MutexGuard<'_, PipelineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Main coordinator structure
pub struct Coordinator<S: TabularStore> {
    config: ExtractionConfig,
    catalog: CourseCatalog,
    browser: Arc<dyn Browser>,
    resolver: Arc<ElementResolver>,
    checkpoints: Arc<CheckpointManager>,
    store: S,
    state: SharedState,
    phase: RunPhase,
}

impl<S: TabularStore> Coordinator<S> {
    /// Creates a coordinator in the `Init` phase
    ///
    /// # Arguments
    ///
    /// * `config` - Concurrency, retry and timeout settings
    /// * `catalog` - Course name to repository URL mapping
    /// * `browser` - Authenticated browsing context jobs open pages from
    /// * `store` - Tabular store holding the input rows
    /// * `checkpoints` - Checkpoint file manager
    pub fn new(
        config: ExtractionConfig,
        catalog: CourseCatalog,
        browser: Arc<dyn Browser>,
        store: S,
        checkpoints: CheckpointManager,
    ) -> Self {
        let resolver = ElementResolver::new(ResolverConfig::from(&config));
        Self {
            config,
            catalog,
            browser,
            resolver: Arc::new(resolver),
            checkpoints: Arc::new(checkpoints),
            store,
            state: Arc::new(Mutex::new(PipelineState::new())),
            phase: RunPhase::Init,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Shared handle to the run's cache and processed set
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn transition(&mut self, to: RunPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Runs the pipeline to completion
    ///
    /// Job failures are counted in the result; errors while enumerating or
    /// writing the output move the run to `Failed` and are returned.
    pub async fn run(&mut self) -> Result<RunResult, HarvestError> {
        let start_time = Instant::now();

        match self.run_phases().await {
            Ok(result) => {
                tracing::info!(
                    "Run finished in {:.1}s: {} succeeded, {} failed, {} omitted, {} skipped",
                    start_time.elapsed().as_secs_f64(),
                    result.succeeded,
                    result.failed,
                    result.omitted,
                    result.skipped
                );
                Ok(result)
            }
            Err(e) => {
                tracing::error!("Run failed during {}: {}", self.phase, e);
                if self.phase.can_transition_to(RunPhase::Failed) {
                    self.phase = RunPhase::Failed;
                }
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<RunResult, HarvestError> {
        self.transition(RunPhase::Restore)?;
        self.restore().await;

        self.transition(RunPhase::Enumerate)?;
        let enumeration = self.enumerate().await?;

        self.transition(RunPhase::Schedule)?;
        let scheduler = self.schedule(&enumeration.items).await?;

        self.transition(RunPhase::AwaitCompletion)?;
        let report = self.await_completion(scheduler).await;

        self.transition(RunPhase::MapOutput)?;
        let mapped = self.map_output(&enumeration.rows);

        self.transition(RunPhase::Persist)?;
        self.persist(&mapped)?;

        self.transition(RunPhase::Done)?;
        Ok(RunResult {
            succeeded: report.succeeded,
            failed: report.failed,
            omitted: mapped.omitted,
            skipped: enumeration.skipped,
        })
    }

    async fn restore(&mut self) {
        if let Some(restored) = self.checkpoints.restore().await {
            *lock_state(&self.state) = restored;
        }
    }

    /// Builds the deduplicated list of work items
    ///
    /// Repository pages are listed once per distinct URL, and only for
    /// courses that still have unprocessed rows.
    async fn enumerate(&mut self) -> Result<Enumeration, HarvestError> {
        let rows = self.store.read_rows()?;
        tracing::info!("Read {} input rows", rows.len());

        let mut skipped = 0;
        let mut queued: HashSet<WorkKey> = HashSet::new();
        let mut url_order: Vec<String> = Vec::new();
        let mut candidates: HashMap<String, Vec<WorkItem>> = HashMap::new();

        {
            let state = lock_state(&self.state);
            for row in &rows {
                let key = WorkKey::new(row.case_name.clone(), row.teaching_point.clone());
                if state.is_processed(&key) {
                    skipped += 1;
                    continue;
                }

                let Some(url) = self.catalog.lookup(&row.course) else {
                    let e = HarvestError::UnknownCourse {
                        course: row.course.clone(),
                    };
                    tracing::warn!("Row {} not scheduled: {}", row.row_id, e);
                    continue;
                };

                if !queued.insert(key) {
                    continue;
                }

                let items = candidates.entry(url.to_string()).or_insert_with(|| {
                    url_order.push(url.to_string());
                    Vec::new()
                });
                items.push(WorkItem {
                    course_url: url.to_string(),
                    case_name: row.case_name.clone(),
                    teaching_point: row.teaching_point.clone(),
                });
            }
        }

        if skipped > 0 {
            tracing::info!("Skipping {} rows processed by an earlier run", skipped);
        }

        let mut items = Vec::new();
        if !url_order.is_empty() {
            let page = self.browser.open_page().await?;
            let mut index = DocumentIndex::new(page, self.config.navigation_timeout());
            let listed = self
                .list_candidates(&mut index, &url_order, &mut candidates, &mut items)
                .await;
            index.close().await;
            listed?;
        }

        tracing::info!("Enumerated {} work items", items.len());
        Ok(Enumeration {
            rows,
            items,
            skipped,
        })
    }

    async fn list_candidates(
        &self,
        index: &mut DocumentIndex,
        url_order: &[String],
        candidates: &mut HashMap<String, Vec<WorkItem>>,
        items: &mut Vec<WorkItem>,
    ) -> Result<(), HarvestError> {
        for url in url_order {
            let Some(wanted) = candidates.remove(url) else {
                continue;
            };

            let listed: HashSet<String> = index
                .list_cases(url)
                .await
                .map_err(|e| HarvestError::Enumeration {
                    course: self.course_name_for(url),
                    url: url.clone(),
                    message: e.to_string(),
                })?
                .into_iter()
                .collect();

            for item in wanted {
                if listed.contains(&item.case_name) {
                    items.push(item);
                } else {
                    tracing::warn!(
                        "Case '{}' is not listed at {}, not scheduling it",
                        item.case_name,
                        url
                    );
                }
            }
        }
        Ok(())
    }

    fn course_name_for(&self, url: &str) -> String {
        self.catalog
            .entries()
            .iter()
            .find(|entry| entry.url == url)
            .map(|entry| entry.name.clone())
            .unwrap_or_default()
    }

    async fn schedule(&mut self, items: &[WorkItem]) -> Result<ConcurrencyScheduler, HarvestError> {
        let mut scheduler = ConcurrencyScheduler::new(self.config.max_concurrent_jobs as usize);
        let context = JobContext {
            browser: Arc::clone(&self.browser),
            resolver: Arc::clone(&self.resolver),
            state: Arc::clone(&self.state),
            checkpoints: Arc::clone(&self.checkpoints),
            navigation_timeout: self.config.navigation_timeout(),
            checkpoint_interval: self.config.checkpoint_interval.max(1) as usize,
            finished: Arc::new(AtomicUsize::new(0)),
            total: items.len(),
        };

        for item in items {
            let context = context.clone();
            let item = item.clone();
            scheduler
                .submit(item.key().to_string(), run_job(context, item))
                .await?;
        }

        tracing::debug!(
            "Submitted {} jobs with at most {} in flight",
            scheduler.submitted(),
            scheduler.limit()
        );
        Ok(scheduler)
    }

    async fn await_completion(&mut self, scheduler: ConcurrencyScheduler) -> SchedulerReport {
        let report = scheduler.join().await;
        tracing::info!(
            "All jobs finished: {} succeeded, {} failed (peak concurrency {})",
            report.succeeded,
            report.failed,
            report.peak_in_flight
        );

        if let Err(e) = self.checkpoints.snapshot(&self.state).await {
            tracing::warn!("Final checkpoint failed: {}", e);
        }
        report
    }

    /// Looks up the cached text of every input row
    fn map_output(&self, rows: &[InputRow]) -> MappedOutput {
        let state = lock_state(&self.state);
        let mut mapped = MappedOutput::default();

        for row in rows {
            let synopsis_key = CacheKey::synopsis(&row.case_name);
            match state.cache.get(&synopsis_key) {
                Some(text) => mapped.synopses.push(OutputRow {
                    row_id: row.row_id,
                    row_key: row.case_name.clone(),
                    value: text.to_string(),
                }),
                None => {
                    let miss = HarvestError::CacheMiss {
                        key: synopsis_key.to_string(),
                    };
                    tracing::debug!("Row {}: {}", row.row_id, miss);
                    mapped.omitted += 1;
                }
            }

            if let Some(teaching_point) = &row.teaching_point {
                let key = CacheKey::teaching_point(&row.case_name, teaching_point);
                match state.cache.get(&key) {
                    Some(text) => mapped.teaching_points.push(OutputRow {
                        row_id: row.row_id,
                        row_key: teaching_point.clone(),
                        value: text.to_string(),
                    }),
                    None => {
                        let miss = HarvestError::CacheMiss {
                            key: key.to_string(),
                        };
                        tracing::debug!("Row {}: {}", row.row_id, miss);
                        mapped.omitted += 1;
                    }
                }
            }
        }

        if mapped.omitted > 0 {
            tracing::warn!("{} output cells have no extracted text", mapped.omitted);
        }
        mapped
    }

    fn persist(&mut self, mapped: &MappedOutput) -> Result<(), HarvestError> {
        let synopses = self
            .store
            .write_column(OutputColumn::Synopsis, &mapped.synopses)?;
        let teaching_points = self
            .store
            .write_column(OutputColumn::TeachingPointText, &mapped.teaching_points)?;

        tracing::info!(
            "Wrote {} synopsis cells and {} teaching point cells",
            synopses,
            teaching_points
        );
        Ok(())
    }
}

/// Target for the link that opens a case from its repository page
fn case_link_target(case_name: &str) -> TargetDescriptor {
    TargetDescriptor::new(case_name, "link", "a")
}

/// Target for the control switching the document's view mode
fn view_mode_target() -> TargetDescriptor {
    TargetDescriptor::new("View mode", "combobox", "select").with_structural_path(VIEW_MODE_PATH)
}

/// Target for the rendered case document
fn document_body_target() -> TargetDescriptor {
    TargetDescriptor::new("doc-body", "document", "div").with_structural_path(DOCUMENT_BODY_PATH)
}

/// One scrape job: extract, record the item as processed, maybe snapshot
///
/// The item is marked processed whether or not extraction succeeded, so a
/// resumed run does not retry it.
async fn run_job(context: JobContext, item: WorkItem) -> Result<(), HarvestError> {
    let result = extract_item(&context, &item).await;

    lock_state(&context.state).mark_processed(item.key());

    let finished = context.finished.fetch_add(1, Ordering::SeqCst) + 1;
    if finished % context.checkpoint_interval == 0 {
        tracing::info!("Progress: {}/{} work items finished", finished, context.total);
        if let Err(e) = context.checkpoints.snapshot(&context.state).await {
            tracing::warn!("Checkpoint after {} items failed: {}", finished, e);
        }
    }

    result
}

/// Extracts whatever the cache still lacks for `item`
///
/// Units that parsed are cached even when another unit of the same item
/// failed; the first failure is returned.
async fn extract_item(context: &JobContext, item: &WorkItem) -> Result<(), HarvestError> {
    let synopsis_key = CacheKey::synopsis(&item.case_name);
    let teaching_point_key = item
        .teaching_point
        .as_ref()
        .map(|tp| CacheKey::teaching_point(&item.case_name, tp));

    let (need_synopsis, need_teaching_point) = {
        let state = lock_state(&context.state);
        (
            !state.cache.contains(&synopsis_key),
            teaching_point_key
                .as_ref()
                .is_some_and(|key| !state.cache.contains(key)),
        )
    };

    if !need_synopsis && !need_teaching_point {
        tracing::debug!("Everything for {} is already cached", item.key());
        return Ok(());
    }

    let unit = capture_case(context, item).await?;

    let synopsis = need_synopsis.then(|| parse_synopsis(&unit.text));
    let teaching_point = match (&item.teaching_point, need_teaching_point) {
        (Some(name), true) => Some(parse_teaching_point(&unit.markup, name)),
        _ => None,
    };

    let mut first_error = None;
    let mut state = lock_state(&context.state);

    match synopsis {
        Some(Ok(text)) => state.cache.put(synopsis_key, text),
        Some(Err(e)) => first_error = Some(e),
        None => {}
    }

    match (teaching_point, teaching_point_key) {
        (Some(Ok(text)), Some(key)) => state.cache.put(key, text),
        (Some(Err(e)), _) => {
            first_error.get_or_insert(e);
        }
        _ => {}
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Opens a page, captures the case document, and closes the page on every path
async fn capture_case(context: &JobContext, item: &WorkItem) -> Result<ScrapedUnit, HarvestError> {
    let mut page = context.browser.open_page().await?;
    let captured = capture_on_page(context, page.as_mut(), item).await;

    if let Err(e) = page.close().await {
        tracing::debug!("Failed to close page for {}: {}", item.key(), e);
    }
    captured
}

async fn capture_on_page(
    context: &JobContext,
    page: &mut dyn Page,
    item: &WorkItem,
) -> Result<ScrapedUnit, HarvestError> {
    navigate_within(page, &item.course_url, context.navigation_timeout).await?;
    page.wait_for_load(LoadState::DomContentLoaded).await?;

    context
        .resolver
        .resolve(page, &case_link_target(&item.case_name), Action::Click)
        .await?;
    page.wait_for_load(LoadState::NetworkIdle).await?;

    // Pages without the control are read as rendered
    match context
        .resolver
        .resolve(page, &view_mode_target(), Action::SelectOption(FULL_VIEW_MODE))
        .await
    {
        Ok(_) => page.wait_for_load(LoadState::NetworkIdle).await?,
        Err(HarvestError::Resolution { .. }) => {
            tracing::debug!("No view mode control for {}", item.key());
        }
        Err(e) => return Err(e),
    }

    let text = context
        .resolver
        .resolve(page, &document_body_target(), Action::ExtractText)
        .await?
        .into_content()
        .unwrap_or_default();
    let markup = page_markup(page).await?;

    tracing::debug!(
        "Captured {} ({} chars of text, {} bytes of markup)",
        item.key(),
        text.len(),
        markup.len()
    );
    Ok(ScrapedUnit { text, markup })
}
