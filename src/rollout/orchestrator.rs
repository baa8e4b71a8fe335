//! Workflow state machine.
//!
//! # States
//! ```text
//! Idle → Snapshotting → Activating → Probing → Restoring → Done
//!   └──────────┴─────────────┴───────────┴───────────┴──→ Fatal
//! ```
//!
//! Probing ends on reachability, on the optional deadline, on cancellation or
//! when the prober gives up; every one of those leads to Restoring. Restoring
//! is never interrupted. A cancellation already pending once the snapshot is
//! taken skips straight to Done without writing.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use tokio::sync::broadcast;
use tokio::time;
use tracing::Instrument;
use uuid::Uuid;

use crate::http::server::{Responder, ResponderHandle};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::probe::{Probe, ReachabilityProber};
use crate::resilience::Backoff;
use crate::resource::mutator::{add_validation_rule, has_validation_rule};
use crate::resource::{ResourceRef, ServicePort};
use crate::rollout::error::WorkflowError;
use crate::rollout::snapshot::{Snapshot, SnapshotManager};
use crate::rollout::writer::{ConflictWriter, ConvergeReport};
use crate::store::ResourceStore;

const RESPONDER_DRAIN: Duration = Duration::from_secs(5);

/// Workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Snapshotting,
    Activating,
    Probing,
    Restoring,
    Done,
    Fatal,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Snapshotting => "snapshotting",
            Phase::Activating => "activating",
            Phase::Probing => "probing",
            Phase::Restoring => "restoring",
            Phase::Done => "done",
            Phase::Fatal => "fatal",
        }
    }

    /// Numeric form for the phase gauge.
    pub fn ordinal(&self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Snapshotting => 1,
            Phase::Activating => 2,
            Phase::Probing => 3,
            Phase::Restoring => 4,
            Phase::Done => 5,
            Phase::Fatal => 6,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the Probing phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// The validation path answered 200.
    Confirmed,
    /// The prober hit its attempt limit.
    GaveUp,
    /// The probing deadline expired first.
    DeadlineExpired,
    /// A cancellation was requested.
    Cancelled,
}

impl ProbeVerdict {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, ProbeVerdict::Confirmed)
    }
}

/// What to route and where to check that it is live.
#[derive(Debug, Clone)]
pub struct ChallengeTarget {
    pub resource: ResourceRef,
    pub service_name: String,
    pub service_port: ServicePort,
    pub probe_url: Uri,
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub resource: ResourceRef,
    pub snapshot_len: usize,
    pub verdict: ProbeVerdict,
    pub activation_attempts: u32,
    pub restore_attempts: u32,
}

/// State carried between phases.
enum Step {
    Idle,
    Snapshotting,
    Activating {
        snapshot: Snapshot,
    },
    Probing {
        snapshot: Snapshot,
        activation: ConvergeReport,
    },
    Restoring {
        snapshot: Snapshot,
        activation: ConvergeReport,
        verdict: ProbeVerdict,
    },
    Done(RunReport),
}

impl Step {
    fn phase(&self) -> Phase {
        match self {
            Step::Idle => Phase::Idle,
            Step::Snapshotting => Phase::Snapshotting,
            Step::Activating { .. } => Phase::Activating,
            Step::Probing { .. } => Phase::Probing,
            Step::Restoring { .. } => Phase::Restoring,
            Step::Done(_) => Phase::Done,
        }
    }
}

/// Runs one snapshot → activate → probe → restore cycle.
pub struct Orchestrator<S: ?Sized, P> {
    run_id: Uuid,
    target: ChallengeTarget,
    store: Arc<S>,
    snapshots: SnapshotManager,
    writer: ConflictWriter<S>,
    prober: ReachabilityProber<P>,
    responder: Option<Responder>,
    responder_task: Option<ResponderHandle>,
    responder_shutdown: Shutdown,
    deadline: Option<Duration>,
    cancel: Option<broadcast::Receiver<()>>,
    phase: Phase,
}

impl<S, P> Orchestrator<S, P>
where
    S: ResourceStore + ?Sized,
    P: Probe,
{
    pub fn new(store: Arc<S>, prober: ReachabilityProber<P>, target: ChallengeTarget) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            snapshots: SnapshotManager::new(target.resource.clone()),
            writer: ConflictWriter::new(store.clone()),
            store,
            target,
            prober,
            responder: None,
            responder_task: None,
            responder_shutdown: Shutdown::new(),
            deadline: None,
            cancel: None,
            phase: Phase::Idle,
        }
    }

    /// Delay policy between conflicting writes.
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.writer = ConflictWriter::with_backoff(self.store.clone(), backoff);
        self
    }

    /// Bound responder started on entry to Probing and stopped at the end.
    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Force the restore once probing has run for `deadline`.
    pub fn with_probe_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Force the restore when `cancel` fires before probing completes.
    pub fn with_cancellation(mut self, cancel: &Shutdown) -> Self {
        self.cancel = Some(cancel.subscribe());
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Drive the workflow to `Done` or abort with a fatal error.
    pub async fn run(mut self) -> Result<RunReport, WorkflowError> {
        let span = tracing::info_span!(
            "challenge",
            run_id = %self.run_id,
            resource = %self.target.resource
        );

        async move {
            let outcome = self.drive().await;
            if let Err(e) = &outcome {
                self.enter(Phase::Fatal);
                if e.leaves_validation_rule() {
                    tracing::error!(
                        phase = %e.phase(),
                        resource = %e.resource(),
                        error = %e,
                        "Workflow aborted; the validation rule may still be present, inspect the ingress manually"
                    );
                } else {
                    tracing::error!(
                        phase = %e.phase(),
                        resource = %e.resource(),
                        error = %e,
                        "Workflow aborted before the ingress was modified"
                    );
                }
            }
            self.stop_responder().await;
            self.snapshots.release();
            outcome
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> Result<RunReport, WorkflowError> {
        let mut step = Step::Idle;

        loop {
            step = match step {
                Step::Idle => Step::Snapshotting,

                Step::Snapshotting => {
                    let snapshot = self
                        .snapshots
                        .capture(self.store.as_ref())
                        .await
                        .map_err(|e| WorkflowError::from_snapshot(Phase::Snapshotting, e))?;
                    if has_validation_rule(snapshot.rules()) {
                        tracing::warn!(
                            resource = %self.target.resource,
                            "Snapshot already routes the validation path; a previous run may not have restored it"
                        );
                    }
                    if self.cancel_requested() {
                        tracing::warn!("Cancellation requested, leaving the ingress untouched");
                        Step::Done(RunReport {
                            run_id: self.run_id,
                            resource: self.target.resource.clone(),
                            snapshot_len: snapshot.len(),
                            verdict: ProbeVerdict::Cancelled,
                            activation_attempts: 0,
                            restore_attempts: 0,
                        })
                    } else {
                        Step::Activating { snapshot }
                    }
                }

                Step::Activating { snapshot } => {
                    tracing::info!("Adding the validation path");
                    let desired = add_validation_rule(
                        snapshot.rules(),
                        &self.target.service_name,
                        self.target.service_port.clone(),
                    );
                    let activation = self
                        .writer
                        .converge(&self.target.resource, &desired)
                        .await
                        .map_err(|e| WorkflowError::from_converge(Phase::Activating, e))?;
                    Step::Probing {
                        snapshot,
                        activation,
                    }
                }

                Step::Probing {
                    snapshot,
                    activation,
                } => {
                    self.start_responder();
                    let verdict = self.await_reachability().await;
                    Step::Restoring {
                        snapshot,
                        activation,
                        verdict,
                    }
                }

                Step::Restoring {
                    snapshot,
                    activation,
                    verdict,
                } => {
                    tracing::info!("Restoring the original ingress rules");
                    let restore = self
                        .writer
                        .converge(&self.target.resource, snapshot.rules())
                        .await
                        .map_err(|e| WorkflowError::from_converge(Phase::Restoring, e))?;
                    Step::Done(RunReport {
                        run_id: self.run_id,
                        resource: self.target.resource.clone(),
                        snapshot_len: snapshot.len(),
                        verdict,
                        activation_attempts: activation.attempts,
                        restore_attempts: restore.attempts,
                    })
                }

                Step::Done(report) => {
                    if report.activation_attempts == 0 {
                        tracing::info!(verdict = ?report.verdict, "Finished without modifying the ingress");
                    } else {
                        tracing::info!(
                            verdict = ?report.verdict,
                            activation_attempts = report.activation_attempts,
                            restore_attempts = report.restore_attempts,
                            "Ingress restored"
                        );
                    }
                    return Ok(report);
                }
            };

            self.enter(step.phase());
        }
    }

    fn enter(&mut self, next: Phase) {
        tracing::info!(from = %self.phase, to = %next, "Phase transition");
        metrics::record_phase(next);
        self.phase = next;
    }

    fn start_responder(&mut self) {
        if let Some(responder) = self.responder.take() {
            let handle = responder.spawn(self.responder_shutdown.subscribe());
            self.responder_task = Some(handle);
        }
    }

    async fn stop_responder(&mut self) {
        self.responder_shutdown.trigger();
        if let Some(handle) = self.responder_task.take() {
            let addr = handle.addr();
            if time::timeout(RESPONDER_DRAIN, handle.join()).await.is_err() {
                tracing::warn!(address = %addr, "Responder did not stop in time");
            }
        }
    }

    /// Non-blocking check for a cancellation already delivered.
    fn cancel_requested(&mut self) -> bool {
        match self.cancel.as_mut().map(|rx| rx.try_recv()) {
            Some(Ok(())) | Some(Err(broadcast::error::TryRecvError::Lagged(_))) => true,
            Some(Err(_)) | None => false,
        }
    }

    async fn await_reachability(&mut self) -> ProbeVerdict {
        let prober = &self.prober;
        let url = &self.target.probe_url;
        let deadline = self.deadline;
        let cancel = &mut self.cancel;

        let deadline_elapsed = async move {
            match deadline {
                Some(limit) => time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        let cancelled = async move {
            if let Some(rx) = cancel {
                loop {
                    match rx.recv().await {
                        Ok(()) => return,
                        Err(broadcast::error::RecvError::Lagged(_)) => return,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            std::future::pending::<()>().await
        };

        tokio::select! {
            reachable = prober.wait_until_reachable(url) => {
                if reachable {
                    ProbeVerdict::Confirmed
                } else {
                    ProbeVerdict::GaveUp
                }
            }
            _ = deadline_elapsed => {
                tracing::warn!(deadline = ?deadline, "Probe deadline expired, restoring without confirmation");
                ProbeVerdict::DeadlineExpired
            }
            _ = cancelled => {
                tracing::warn!("Cancellation requested, restoring without confirmation");
                ProbeVerdict::Cancelled
            }
        }
    }
}
