//! Run orchestration: phase state machine, worker thread, cancellation.
//!
//! One classification run owns everything it builds: the collected snapshot
//! arena, the handle space, and the encoded ontology live inside the run and
//! are dropped when their phase ends. Only the equivalence report and the
//! change set cross the run boundary, both as immutable snapshots.
//!
//! Cancellation is cooperative and only honored between work units during the
//! collecting phase. The engine offers no cooperative cancellation, so a
//! cancel requested once classification has started is deferred: the run
//! completes and the outcome is flagged accordingly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use serde::Deserialize;

use crate::concept::ConceptId;
use crate::encode::{EncodeParams, encode};
use crate::engine::ClassificationEngine;
use crate::error::{BridgeResult, ConfigError, EngineError};
use crate::reconcile::{ChangeSet, Reconciler};
use crate::report::EquivalenceReport;
use crate::source::{ConceptSnapshot, ConceptSource, PathId};

/// Externally supplied run configuration.
///
/// The scope root, the role root, and the limits are deployment decisions,
/// not code: they are read from TOML.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RunConfig {
    /// Scope root concept; passed to the engine as the classification root.
    pub root: ConceptId,
    /// The IS-A relationship type concept.
    pub isa: ConceptId,
    /// Concept whose descendants define the legal role set.
    pub role_root: ConceptId,
    /// Hard upper bound on the role array size.
    #[serde(default = "default_max_roles")]
    pub max_roles: usize,
    /// Concept-array growth margin for engine-internal synthesis, in percent.
    #[serde(default = "default_margin_percent")]
    pub margin_percent: u32,
    /// Concepts per progress tick during collection.
    #[serde(default = "default_progress_batch")]
    pub progress_batch: usize,
}

fn default_max_roles() -> usize {
    100
}

fn default_margin_percent() -> u32 {
    25
}

fn default_progress_batch() -> usize {
    1024
}

impl RunConfig {
    /// Parse and validate a TOML configuration document.
    pub fn from_toml_str(toml: &str) -> BridgeResult<Self> {
        let config: RunConfig =
            toml::from_str(toml).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a valid run.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.max_roles == 0 {
            return Err(ConfigError::Invalid {
                message: "max_roles must be at least 1 (IS-A is always a role)".into(),
            }
            .into());
        }
        if self.progress_batch == 0 {
            return Err(ConfigError::Invalid {
                message: "progress_batch must be at least 1".into(),
            }
            .into());
        }
        Ok(())
    }

    /// The encoder's view of this configuration.
    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            isa: self.isa,
            role_root: self.role_root,
            max_roles: self.max_roles,
            margin_percent: self.margin_percent,
        }
    }
}

/// Phases a classification run passes through.
///
/// Failure is not a phase: an error propagates out of [`execute`] carrying
/// the phase it occurred in via the error variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Classifying,
    Reconciling,
    Done,
    Cancelled,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Collecting => "collecting",
            Phase::Classifying => "classifying",
            Phase::Reconciling => "reconciling",
            Phase::Done => "done",
            Phase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Destination for progress updates.
///
/// Implementations must not block the worker thread; marshal to a queue if
/// the consumer is slow.
pub trait ProgressSink: Send + Sync {
    /// Report `percent` complete with a human-readable status.
    fn report(&self, percent: u8, status: &str);
}

/// Discards all progress updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8, _status: &str) {}
}

/// Collects progress updates in memory, for testing.
#[derive(Default)]
pub struct VecProgress {
    events: Mutex<Vec<(u8, String)>>,
}

impl VecProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates observed so far.
    pub fn events(&self) -> Vec<(u8, String)> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for VecProgress {
    fn report(&self, percent: u8, status: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((percent, status.to_string()));
        }
    }
}

/// Forwards progress updates to a caller-owned channel.
///
/// Sending never blocks; updates are dropped if the receiver is gone.
pub struct ChannelProgress {
    tx: mpsc::Sender<(u8, String)>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::Sender<(u8, String)>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, percent: u8, status: &str) {
        let _ = self.tx.send((percent, status.to_string()));
    }
}

/// Enforces the monotonic-percentage contract in front of any sink.
struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    fn new(sink: &'a dyn ProgressSink) -> Self {
        Self { sink, last: 0 }
    }

    fn report(&mut self, percent: u8, status: &str) {
        let percent = percent.clamp(self.last, 100);
        self.last = percent;
        self.sink.report(percent, status);
    }
}

/// Terminal result of a run that did not fail.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run completed; the change set is ready for the caller's sink.
    Completed {
        report: EquivalenceReport,
        changes: ChangeSet,
        /// True when a cancel arrived after classification had started and
        /// was deferred to completion.
        cancelled_late: bool,
    },
    /// Cancelled during collection; nothing was produced, the engine was
    /// never invoked.
    Cancelled,
}

// Percent milestones at phase boundaries. Collection progress is capped below
// COLLECTED because the store does not announce its concept count up front.
const PCT_COLLECT_CAP: u8 = 35;
const PCT_COLLECTED: u8 = 40;
const PCT_CLASSIFYING: u8 = 45;
const PCT_CLASSIFIED: u8 = 75;
const PCT_RECONCILING: u8 = 80;
const PCT_DONE: u8 = 100;

/// Run the full pipeline synchronously on the calling thread.
///
/// [`spawn`] wraps this in a dedicated worker; tests drive it directly.
pub fn execute<S, E>(
    source: &S,
    engine: &mut E,
    config: &RunConfig,
    path: PathId,
    progress: &dyn ProgressSink,
    cancel: &AtomicBool,
) -> BridgeResult<RunOutcome>
where
    S: ConceptSource,
    E: ClassificationEngine,
{
    config.validate()?;
    let mut tracker = ProgressTracker::new(progress);

    // -- Collecting ---------------------------------------------------------
    tracing::info!(phase = %Phase::Collecting, %path, "starting classification run");
    tracker.report(0, "collecting concepts");

    let mut arena: Vec<ConceptSnapshot> = Vec::new();
    for item in source.concepts_on_path(path)? {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!(phase = %Phase::Cancelled, collected = arena.len(), "run cancelled");
            tracker.report(tracker.last, "cancelled during collection");
            return Ok(RunOutcome::Cancelled);
        }
        arena.push(item?);
        if arena.len() % config.progress_batch == 0 {
            let pct = (arena.len() / config.progress_batch).min(PCT_COLLECT_CAP as usize) as u8;
            tracker.report(pct, &format!("collected {} concepts", arena.len()));
        }
    }
    let prior = source.inferred_on_path(path)?;
    tracker.report(
        PCT_COLLECTED,
        &format!("collected {} concepts", arena.len()),
    );

    let (space, ontology) = encode(&arena, &config.encode_params())?;
    drop(arena);

    let root = space
        .handle_of(config.root)
        .ok_or(ConfigError::ConceptNotInScope {
            which: "root",
            id: config.root.get(),
        })?;
    let role_root = space
        .handle_of(config.role_root)
        .ok_or(ConfigError::ConceptNotInScope {
            which: "role root",
            id: config.role_root.get(),
        })?;
    let isa = ontology.isa_handle();

    // Last point where cancellation can take effect: the engine's blocking
    // call does not support it.
    if cancel.load(Ordering::Relaxed) {
        tracing::info!(phase = %Phase::Cancelled, "run cancelled before classification");
        tracker.report(tracker.last, "cancelled during collection");
        return Ok(RunOutcome::Cancelled);
    }

    // -- Classifying --------------------------------------------------------
    tracing::info!(
        phase = %Phase::Classifying,
        concepts = ontology.populated,
        roles = ontology.roles.len(),
        relationships = ontology.relationships.len(),
        "invoking classification engine"
    );
    tracker.report(PCT_CLASSIFYING, "classifying");

    engine.configure(root, isa, role_root)?;
    engine.load_axioms(ontology)?;
    engine.classify()?;
    tracker.report(PCT_CLASSIFIED, "classification complete");

    // -- Reconciling --------------------------------------------------------
    tracing::info!(phase = %Phase::Reconciling, prior = prior.len(), "reconciling");
    tracker.report(PCT_RECONCILING, "reconciling results");

    let (report, changes) = Reconciler::new(&space).reconcile(engine, &prior)?;

    let cancelled_late = cancel.load(Ordering::Relaxed);
    let status = if cancelled_late {
        "completed after cancellation was requested"
    } else {
        "done"
    };
    tracing::info!(phase = %Phase::Done, cancelled_late, "run complete");
    tracker.report(PCT_DONE, status);

    Ok(RunOutcome::Completed {
        report,
        changes,
        cancelled_late,
    })
}

/// Handle to a run executing on its dedicated worker thread.
pub struct RunHandle {
    cancel: Arc<AtomicBool>,
    worker: thread::JoinHandle<BridgeResult<RunOutcome>>,
}

impl RunHandle {
    /// Request cancellation. Honored between work units while collecting;
    /// advisory once classification has begun.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Wait for the run to reach a terminal state.
    pub fn join(self) -> BridgeResult<RunOutcome> {
        match self.worker.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(EngineError::Failed {
                phase: "worker",
                message: "run worker thread panicked".into(),
            }
            .into()),
        }
    }
}

/// Start a run on a dedicated worker thread.
///
/// The caller serializes runs per scope; the bridge provides no internal
/// locking. The progress sink is shared with the worker and must not block.
pub fn spawn<S, E>(
    source: S,
    mut engine: E,
    config: RunConfig,
    path: PathId,
    progress: Arc<dyn ProgressSink>,
) -> BridgeResult<RunHandle>
where
    S: ConceptSource + Send + 'static,
    E: ClassificationEngine + Send + 'static,
{
    config.validate()?;
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_worker = Arc::clone(&cancel);

    let worker = thread::Builder::new()
        .name("ontobridge-run".into())
        .spawn(move || {
            execute(
                &source,
                &mut engine,
                &config,
                path,
                progress.as_ref(),
                &cancel_worker,
            )
        })
        .map_err(|e| EngineError::Failed {
            phase: "spawn",
            message: format!("failed to start run worker: {e}"),
        })?;

    Ok(RunHandle { cancel, worker })
}
