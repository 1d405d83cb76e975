// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Periodic workers and application wiring.
//!
//! Two independent workers share one [`StateStore`]:
//!
//! - **update** runs [`Reconciler::run_cycle`] every `app.update_interval`
//! - **prune** runs [`Pruner::run_cycle`] every `app.prune_interval`
//!
//! Each worker moves through [`WorkerState`]:
//! `Idle -> WaitingOnTick -> Running -> Idle`, ending in `Stopped` once the
//! [`RunContext`] is cancelled. A worker first fires one full interval after
//! it starts. Cancellation wins over a tick that is ready at the same time, so
//! no job starts after cancellation is observed; a job already running is
//! always allowed to finish.

use crate::cluster::ClusterClient;
use crate::config::{validate_intervals, Config};
use crate::errors::ConfigError;
use crate::metrics;
use crate::provider::DnsProvider;
use crate::pruner::{Pruner, PRUNE_WORKER};
use crate::reconciler::{Reconciler, UPDATE_WORKER};
use crate::state::StateStore;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace};

// ============================================================================
// Run Context
// ============================================================================

/// Cancellation handle shared by every worker; cheap to clone.
#[derive(Clone, Debug)]
pub struct RunContext {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Cancel every worker holding a clone of this context.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of the context.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

// ============================================================================
// Periodic Worker
// ============================================================================

/// Phase of a periodic worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    WaitingOnTick,
    Running,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::WaitingOnTick => "waiting",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Run `job` every `period` until `ctx` is cancelled.
///
/// The first run happens one full `period` after the call. Missed ticks are
/// delayed rather than burst, so runs never overlap.
///
/// # Returns
///
/// The number of completed runs.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    ctx: RunContext,
    mut job: F,
) -> u64
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = ()> + Send,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut runs = 0;
    let mut state = WorkerState::Idle;
    info!(worker = name, interval = ?period, "Starting worker");

    loop {
        state = transition(name, state, WorkerState::WaitingOnTick);

        tokio::select! {
            biased;

            () = ctx.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if ctx.is_cancelled() {
            break;
        }

        state = transition(name, state, WorkerState::Running);
        job().await;
        runs += 1;
        state = transition(name, state, WorkerState::Idle);
    }

    transition(name, state, WorkerState::Stopped);
    info!(worker = name, runs = runs, "Worker stopped");
    runs
}

fn transition(name: &str, from: WorkerState, to: WorkerState) -> WorkerState {
    trace!(worker = name, from = %from, to = %to, "Worker state change");
    to
}

// ============================================================================
// Application
// ============================================================================

/// The update and prune workers wired to one provider, cluster and state.
pub struct App {
    update_interval: Duration,
    prune_interval: Duration,
    metrics_addr: Option<SocketAddr>,
    state: StateStore,
    reconciler: Arc<Reconciler>,
    pruner: Arc<Pruner>,
}

impl App {
    /// Wire the workers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PruneIntervalTooShort`] if the prune interval is
    /// shorter than the update interval. No worker exists at that point.
    pub fn new(
        config: &Config,
        provider: Arc<dyn DnsProvider>,
        cluster: Arc<dyn ClusterClient>,
    ) -> Result<Self, ConfigError> {
        validate_intervals(config.app.update_interval, config.app.prune_interval)?;

        let state = StateStore::new();
        let domains = config.domains();
        let owner = config.dns.owner_uuid.clone();

        let reconciler = Reconciler::new(
            Arc::clone(&provider),
            cluster,
            state.clone(),
            domains.clone(),
            owner.clone(),
        );
        let pruner = Pruner::new(provider, state.clone(), domains, owner);

        Ok(Self {
            update_interval: config.app.update_interval,
            prune_interval: config.app.prune_interval,
            metrics_addr: config.app.metrics_addr,
            state,
            reconciler: Arc::new(reconciler),
            pruner: Arc::new(pruner),
        })
    }

    /// Shared reconciliation state.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Spawn both workers, plus the metrics endpoint when configured, and
    /// wait until they have stopped.
    pub async fn start(&self, ctx: RunContext) {
        let server = self.metrics_addr.map(|addr| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(e) = metrics::serve(addr, ctx).await {
                    error!(address = %addr, error = %e, "Metrics server failed");
                }
            })
        });

        let reconciler = Arc::clone(&self.reconciler);
        let update = tokio::spawn(run_periodic(
            UPDATE_WORKER,
            self.update_interval,
            ctx.clone(),
            move || {
                let reconciler = Arc::clone(&reconciler);
                async move {
                    if let Err(e) = reconciler.run_cycle().await {
                        error!(worker = UPDATE_WORKER, reason = e.reason(), error = %e, "Skipping reconciliation cycle");
                    }
                }
            },
        ));

        let pruner = Arc::clone(&self.pruner);
        let prune = tokio::spawn(run_periodic(
            PRUNE_WORKER,
            self.prune_interval,
            ctx,
            move || {
                let pruner = Arc::clone(&pruner);
                async move {
                    if let Err(e) = pruner.run_cycle().await {
                        error!(worker = PRUNE_WORKER, reason = e.reason(), error = %e, "Skipping prune cycle");
                    }
                }
            },
        ));

        let (update, prune) = tokio::join!(update, prune);
        for (worker, result) in [(UPDATE_WORKER, update), (PRUNE_WORKER, prune)] {
            match result {
                Ok(runs) => debug!(worker = worker, runs = runs, "Worker joined"),
                Err(e) => error!(worker = worker, error = %e, "Worker task failed"),
            }
        }

        if let Some(server) = server {
            if let Err(e) = server.await {
                error!(error = %e, "Metrics server task failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
