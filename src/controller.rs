//! Concurrency Controller
//!
//! Runs many sessions against one endpoint and tallies the outcomes.
//!
//! ## Concurrency Model: Bounded Worker Pool
//!
//! - `concurrency` worker threads pull session ids from a bounded
//!   crossbeam channel, so a run of 50 000 sessions never spawns 50 000
//!   OS threads
//! - Each worker runs one session at a time to completion; sessions block
//!   only on their own socket
//! - Outcomes are folded into one `AggregateReport` behind a
//!   `parking_lot::Mutex`; `record` is the only write
//! - Workers live in a crossbeam scope, so none outlives `run`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{ProbeError, Result};
use crate::report::AggregateReport;
use crate::session::{Session, SessionOutcome};
use crate::workflow::Workflow;

/// Drives a whole harness run
pub struct Controller {
    config: Config,
}

impl Controller {
    /// Create a controller; fails if the config is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every session with the same workflow
    pub fn run_uniform(&self, workflow: &Workflow) -> Result<AggregateReport> {
        self.run(|_| workflow.clone())
    }

    /// Run `config.sessions` sessions, building each one's workflow from
    /// its session index, and block until all have finished.
    pub fn run<F>(&self, workflow_for: F) -> Result<AggregateReport>
    where
        F: Fn(usize) -> Workflow + Sync,
    {
        self.run_with(workflow_for, |_| {})
    }

    /// Like `run`, also handing each finished session to `observe`
    ///
    /// `observe` is called from worker threads, outside the report lock,
    /// after the outcome has been recorded. If a worker panics, the report
    /// holds whatever was recorded before and after the panic.
    pub fn run_with<F, O>(&self, workflow_for: F, observe: O) -> Result<AggregateReport>
    where
        F: Fn(usize) -> Workflow + Sync,
        O: Fn(&SessionOutcome) + Sync,
    {
        let total = self.config.sessions;
        let workers = self.config.concurrency.clamp(1, total.max(1));
        let progress_every = (total / 10).max(1);

        tracing::info!(
            "Starting {} sessions against {} with {} workers",
            total,
            self.config.addr(),
            workers
        );

        let started = Instant::now();
        let report = Mutex::new(AggregateReport::new(self.config.keep_failures));
        let completed = AtomicUsize::new(0);
        let (jobs_tx, jobs_rx) = channel::bounded::<usize>(workers * 2);

        let scoped = crossbeam::scope(|scope| -> Result<()> {
            let config = &self.config;
            let report = &report;
            let completed = &completed;
            let workflow_for = &workflow_for;
            let observe = &observe;

            let mut spawned = 0;
            for worker in 0..workers {
                let jobs = jobs_rx.clone();
                let handle = scope
                    .builder()
                    .name(format!("session-worker-{}", worker))
                    .spawn(move |_| {
                        for id in jobs.iter() {
                            let workflow = workflow_for(id);
                            let outcome = Session::run(id, config, &workflow);
                            report.lock().record(&outcome);
                            observe(&outcome);

                            let done = completed.fetch_add(1, Ordering::AcqRel) + 1;
                            if done % progress_every == 0 || done == total {
                                tracing::debug!("Progress: {}/{} sessions finished", done, total);
                            }
                        }
                    });

                match handle {
                    Ok(_) => spawned += 1,
                    Err(e) => {
                        tracing::warn!("Could not spawn worker {}: {}", worker, e);
                        break;
                    }
                }
            }
            drop(jobs_rx);

            if spawned == 0 {
                return Err(ProbeError::Worker("no session worker could be started".to_string()));
            }
            if spawned < workers {
                tracing::warn!("Running with {} of {} workers", spawned, workers);
            }

            for id in 0..total {
                // Fails only if every worker has exited
                if jobs_tx.send(id).is_err() {
                    return Err(ProbeError::Worker(format!(
                        "workers exited before session {} was queued",
                        id
                    )));
                }
            }
            drop(jobs_tx);
            Ok(())
        });

        // A panicking worker loses only the sessions it never got to; the
        // surviving workers keep draining the queue
        let panicked = match scoped {
            Ok(result) => {
                result?;
                false
            }
            Err(_) => true,
        };

        let mut report = report.into_inner();
        report.set_elapsed(started.elapsed());

        if panicked {
            tracing::error!(
                "A session worker panicked; returning the partial tally of {}/{} sessions",
                report.attempted,
                total
            );
        }

        tracing::info!(
            "Finished: {} attempted, {} succeeded, {} failed in {} ms",
            report.attempted,
            report.succeeded,
            report.failed,
            report.elapsed_ms
        );

        Ok(report)
    }
}
