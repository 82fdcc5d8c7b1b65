//! First Meaningful Paint estimation (single-thread async friendly)
//!
//! Notes for the host crate:
//!  - Drive [`observe`] on a single-thread Tokio runtime
//!    (`#[tokio::main(flavor = "current_thread")]`) or inside a `LocalSet`.
//!  - Hosts with their own event plumbing can use [`FmpTiming`] directly:
//!    call `on_mutations` per notified batch and `try_finalize` on a timer
//!    once the page has loaded.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub mod core;

use crate::core::{
    dom::{Document, DocumentError, DocumentReadyState, MutationObserver, MutationRecord, NodeId},
    fixture::FixtureError,
    geometry::Viewport,
    host::{Clock, ContentTree, MonotonicClock, ResourceTimingSource},
    mutation::MutationTracker,
    network::ResourceTimeIndex,
    resolver::{latest_time, ResolvedElement, TimeResolver},
    scoring::{filter_result, ScoreResult, TreeScorer},
    stability::{FinalizeReason, GateDecision, StabilityGate},
};

#[derive(Error, Debug)]
pub enum FmpError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
    #[error("Fixture error: {0}")]
    Fixture(#[from] FixtureError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FmpError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmpConfig {
    /// Hard cap on observation time, measured from tracker construction.
    pub hard_timeout_ms: u64,
    /// Time without a new snapshot after which the page counts as settled.
    pub quiet_period_ms: u64,
    pub retry_delay_ms: u64,
    pub ignored_categories: Vec<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for FmpConfig {
    fn default() -> Self {
        Self {
            hard_timeout_ms: 3000,
            quiet_period_ms: 1000,
            retry_delay_ms: 500,
            ignored_categories: ["script", "style", "meta", "head", "link"]
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

impl FmpConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry_delay_ms == 0 {
            return Err(FmpError::InvalidConfig(
                "retry_delay_ms must be positive".to_string(),
            ));
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(FmpError::InvalidConfig(format!(
                "viewport must have a non-zero size, got {}x{}",
                self.viewport_width, self.viewport_height
            )));
        }
        if self.quiet_period_ms > self.hard_timeout_ms {
            warn!(
                quiet_period_ms = self.quiet_period_ms,
                hard_timeout_ms = self.hard_timeout_ms,
                "quiet period exceeds hard timeout; only the timeout will finalize"
            );
        }
        Ok(())
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width as f64, self.viewport_height as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FmpReport {
    /// Estimated first meaningful paint in milliseconds on the host clock.
    /// `None` when every winning element was filtered out.
    pub fmp_time: Option<f64>,
    pub reason: FinalizeReason,
    pub winner: NodeId,
    pub winner_score: f64,
    pub candidate_count: usize,
    pub snapshot_count: usize,
    pub finalized_at_ms: f64,
    pub elements: Vec<ResolvedElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Deferred,
    /// Finalization ran. `None` when no subtree scored above zero.
    Finalized(Option<FmpReport>),
    AlreadyFinalized,
}

pub struct FmpTiming<C: Clock = MonotonicClock> {
    config: FmpConfig,
    clock: C,
    start_ms: f64,
    tracker: MutationTracker,
    gate: StabilityGate,
    scorer: TreeScorer,
    finalized: bool,
    report: Option<FmpReport>,
}

impl<C: Clock> FmpTiming<C> {
    pub fn new<T: ContentTree + ?Sized>(config: FmpConfig, tree: &T, clock: C) -> Result<Self> {
        config.validate()?;
        let start_ms = clock.now_ms();
        let viewport = config.viewport();
        let tracker = MutationTracker::new(tree, viewport, &config.ignored_categories, start_ms);
        debug!(
            stamped = tracker.stamped_count(),
            width = viewport.width,
            height = viewport.height,
            "paint tracking started"
        );
        Ok(Self {
            gate: StabilityGate::new(config.hard_timeout(), config.quiet_period()),
            scorer: TreeScorer::new(viewport),
            config,
            clock,
            start_ms,
            tracker,
            finalized: false,
            report: None,
        })
    }

    /// Records one notified batch. Returns the snapshot index, or `None`
    /// once observation has stopped.
    pub fn on_mutations<T: ContentTree + ?Sized>(
        &mut self,
        tree: &T,
        records: &[MutationRecord],
    ) -> Option<usize> {
        if self.finalized {
            trace!(records = records.len(), "mutations after finalization ignored");
            return None;
        }
        let now = self.clock.now_ms();
        Some(self.tracker.record_batch(tree, now))
    }

    pub fn try_finalize<T, R>(&mut self, tree: &T, resources: &R) -> FinalizeOutcome
    where
        T: ContentTree + ?Sized,
        R: ResourceTimingSource + ?Sized,
    {
        if self.finalized {
            return FinalizeOutcome::AlreadyFinalized;
        }
        let now = self.clock.now_ms();
        match self
            .gate
            .evaluate(self.start_ms, self.tracker.last_snapshot_time(), now)
        {
            GateDecision::Defer => {
                debug!(
                    elapsed_ms = now - self.start_ms,
                    snapshots = self.tracker.snapshots().len(),
                    "page still changing, finalization deferred"
                );
                FinalizeOutcome::Deferred
            }
            GateDecision::Finalize(reason) => {
                let report = self.finalize(tree, resources, reason, now);
                self.report = report.clone();
                FinalizeOutcome::Finalized(report)
            }
        }
    }

    fn finalize<T, R>(&mut self, tree: &T, resources: &R, reason: FinalizeReason, now: f64) -> Option<FmpReport>
    where
        T: ContentTree + ?Sized,
        R: ResourceTimingSource + ?Sized,
    {
        self.finalized = true;
        let scored = self.scorer.score_tree(tree, &self.tracker);
        let candidate_count = scored.as_ref().map(|root| root.children.len()).unwrap_or(0);
        let Some(winner) = scored.as_ref().and_then(ScoreResult::best_candidate) else {
            info!(?reason, snapshots = self.tracker.snapshots().len(), "finalized without a meaningful subtree");
            return None;
        };

        let index = ResourceTimeIndex::build(resources);
        let retained = filter_result(winner.winning_elements.clone());
        if retained.is_empty() {
            debug!(
                winning = winner.winning_elements.len(),
                "no winning element scored above the mean"
            );
        }
        let elements = TimeResolver::new(&self.tracker, &index).resolve(tree, &retained);
        let fmp_time = latest_time(&elements);

        info!(
            ?reason,
            ?fmp_time,
            winner_score = winner.score,
            candidates = candidate_count,
            retained = elements.len(),
            "first meaningful paint finalized"
        );
        Some(FmpReport {
            fmp_time,
            reason,
            winner: winner.node,
            winner_score: winner.score,
            candidate_count,
            snapshot_count: self.tracker.snapshots().len(),
            finalized_at_ms: now,
            elements,
        })
    }

    pub fn fmp_time(&self) -> Option<f64> {
        self.report.as_ref().and_then(|report| report.fmp_time)
    }

    pub fn report(&self) -> Option<&FmpReport> {
        self.report.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn tracker(&self) -> &MutationTracker {
        &self.tracker
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn config(&self) -> &FmpConfig {
        &self.config
    }
}

/// Tracks `document` until the paint estimate is final.
pub async fn observe<C, R>(
    document: &Document,
    resources: &R,
    config: FmpConfig,
    clock: C,
) -> Result<Option<FmpReport>>
where
    C: Clock,
    R: ResourceTimingSource + ?Sized,
{
    let mut timing = FmpTiming::new(config, document, clock)?;
    let retry_delay = timing.config().retry_delay();

    let (tx, mut rx) = mpsc::unbounded_channel::<MutationRecord>();
    let handle = document.add_mutation_observer(MutationObserver::child_list(move |records| {
        for record in records {
            let _ = tx.send(record.clone());
        }
    }));

    let mut ready = document.subscribe_ready_state();
    while *ready.borrow_and_update() != DocumentReadyState::Complete {
        tokio::select! {
            Some(record) = rx.recv() => {
                let batch = drain_batch(Some(record), &mut rx);
                timing.on_mutations(document, &batch);
            }
            changed = ready.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!(elapsed_ms = timing.clock.now_ms() - timing.start_ms(), "load signal observed");

    let report = loop {
        let pending = drain_batch(None, &mut rx);
        if !pending.is_empty() {
            timing.on_mutations(document, &pending);
        }
        match timing.try_finalize(document, resources) {
            FinalizeOutcome::Deferred => {
                let delay = tokio::time::sleep(retry_delay);
                tokio::pin!(delay);
                loop {
                    tokio::select! {
                        _ = &mut delay => break,
                        Some(record) = rx.recv() => {
                            let batch = drain_batch(Some(record), &mut rx);
                            timing.on_mutations(document, &batch);
                        }
                    }
                }
            }
            FinalizeOutcome::Finalized(report) => break report,
            FinalizeOutcome::AlreadyFinalized => break timing.report().cloned(),
        }
    };

    document.remove_mutation_observer(handle);
    Ok(report)
}

/// Everything already queued is one batch.
fn drain_batch(
    first: Option<MutationRecord>,
    rx: &mut mpsc::UnboundedReceiver<MutationRecord>,
) -> Vec<MutationRecord> {
    let mut batch: Vec<MutationRecord> = first.into_iter().collect();
    while let Ok(record) = rx.try_recv() {
        batch.push(record);
    }
    batch
}
