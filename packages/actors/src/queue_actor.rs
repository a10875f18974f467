//! Queue actor owning the jobs of a single operation.

use std::collections::{HashMap, HashSet, VecDeque};

use bridge_core::{Job, JobEvent, JobId, JobStatus, QueueConfig, QueueInfo, QueueStats};
use chrono::Utc;
use db::repositories::JobHistoryRepository;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::broadcast;

use crate::messages::{ActorError, QueueMessage};

/// State for the queue actor.
pub struct QueueActorState {
    operation: String,
    config: QueueConfig,
    /// Pending job ids in arrival order.
    pending: VecDeque<JobId>,
    running: HashSet<JobId>,
    /// Every job this queue has accepted that has not been evicted.
    jobs: HashMap<JobId, Job>,
    /// Terminal jobs confirmed archived, oldest first. Only these are evicted.
    archived: VecDeque<JobId>,
    done: u64,
    failed: u64,
    event_tx: broadcast::Sender<JobEvent>,
    history: Option<JobHistoryRepository>,
}

impl QueueActorState {
    pub fn new(
        operation: impl Into<String>,
        config: QueueConfig,
        event_tx: broadcast::Sender<JobEvent>,
    ) -> Self {
        Self {
            operation: operation.into(),
            config,
            pending: VecDeque::new(),
            running: HashSet::new(),
            jobs: HashMap::new(),
            archived: VecDeque::new(),
            done: 0,
            failed: 0,
            event_tx,
            history: None,
        }
    }

    /// Archive terminal jobs to the given repository.
    pub fn with_history(mut self, history: Option<JobHistoryRepository>) -> Self {
        self.history = history;
        self
    }

    fn broadcast(&self, event: JobEvent) {
        tracing::debug!("{}", event.description());
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.len() as u64,
            running: self.running.len() as u64,
            done: self.done,
            failed: self.failed,
        }
    }

    fn info(&self) -> QueueInfo {
        QueueInfo {
            operation: self.operation.clone(),
            config: self.config.clone(),
            stats: self.stats(),
        }
    }

    /// Archive in the background so polls are never held up by the store.
    /// The queue hears back once the record is stored.
    fn archive(&self, job: &Job, myself: &ActorRef<QueueMessage>) {
        if let Some(history) = self.history.clone() {
            let job = job.clone();
            let queue = myself.clone();
            tokio::spawn(async move {
                match history.archive(&job).await {
                    Ok(()) => {
                        let _ = queue.send_message(QueueMessage::JobArchived { job_id: job.id });
                    }
                    Err(e) => tracing::warn!("Failed to archive job {}: {}", job.id, e),
                }
            });
        }
    }

    /// Drop the oldest archived jobs beyond the retention cap.
    fn retain(&mut self, job_id: JobId) {
        self.archived.push_back(job_id);
        while self.archived.len() > self.config.max_retained_jobs {
            if let Some(evicted) = self.archived.pop_front() {
                self.jobs.remove(&evicted);
                tracing::debug!("Evicted archived job {} from {}", evicted, self.operation);
            }
        }
    }

    /// Move a running job to a terminal status. Jobs that are not running are
    /// left untouched, so terminal states never change.
    fn finish(
        &mut self,
        job_id: JobId,
        outcome: Result<serde_json::Value, String>,
        myself: &ActorRef<QueueMessage>,
    ) {
        if !self.running.remove(&job_id) {
            tracing::warn!("Ignoring result for job {} which is not running", job_id);
            return;
        }
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };

        let now = Utc::now();
        let started_at = job.status.started_at().unwrap_or(now);
        let event = match outcome {
            Ok(result) => {
                job.status = JobStatus::Done {
                    started_at,
                    finished_at: now,
                    result,
                };
                self.done += 1;
                JobEvent::JobCompleted {
                    job_id,
                    operation: self.operation.clone(),
                    duration_ms: (now - started_at).num_milliseconds().max(0) as u64,
                    timestamp: now,
                }
            }
            Err(error) => {
                job.status = JobStatus::Failed {
                    started_at: Some(started_at),
                    finished_at: now,
                    error: error.clone(),
                };
                self.failed += 1;
                JobEvent::JobFailed {
                    job_id,
                    operation: self.operation.clone(),
                    error,
                    timestamp: now,
                }
            }
        };
        job.updated_at = now;

        let job = job.clone();
        self.broadcast(event);
        self.archive(&job, myself);
    }
}

/// Queue actor that manages a single operation's jobs.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = QueueActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue actor: {}", args.operation);
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Enqueue { job, reply } => {
                let mut job = *job;

                if let Some(max_size) = state.config.max_queue_size
                    && state.pending.len() >= max_size
                {
                    let _ = reply.send(Err(ActorError::QueueFull(state.operation.clone())));
                    return Ok(());
                }

                job.timeout_secs = state.config.default_timeout_secs;
                let job_id = job.id;
                state.pending.push_back(job_id);
                state.jobs.insert(job_id, job);

                state.broadcast(JobEvent::JobEnqueued {
                    job_id,
                    operation: state.operation.clone(),
                    timestamp: Utc::now(),
                });

                let _ = reply.send(Ok(job_id));
            }

            QueueMessage::RequestJob { worker_id, reply } => {
                if state.running.len() >= state.config.concurrency as usize {
                    let _ = reply.send(None);
                    return Ok(());
                }

                let next = state
                    .pending
                    .pop_front()
                    .and_then(|id| state.jobs.get_mut(&id));

                let Some(job) = next else {
                    let _ = reply.send(None);
                    return Ok(());
                };

                let now = Utc::now();
                job.status = JobStatus::Running {
                    started_at: now,
                    worker_id: worker_id.clone(),
                };
                job.updated_at = now;
                let job = job.clone();
                state.running.insert(job.id);

                state.broadcast(JobEvent::JobStarted {
                    job_id: job.id,
                    operation: state.operation.clone(),
                    worker_id,
                    timestamp: now,
                });

                let _ = reply.send(Some(job));
            }

            QueueMessage::JobCompleted {
                job_id,
                worker_id: _,
                result,
            } => {
                state.finish(job_id, Ok(result), &myself);
            }

            QueueMessage::JobFailed {
                job_id,
                worker_id,
                error,
            } => {
                tracing::warn!("Job {} failed on {}: {}", job_id, worker_id, error);
                state.finish(job_id, Err(error), &myself);
            }

            QueueMessage::JobArchived { job_id } => {
                state.retain(job_id);
            }

            QueueMessage::GetJob { job_id, reply } => {
                let _ = reply.send(state.jobs.get(&job_id).cloned());
            }

            QueueMessage::ListJobs {
                status_filter,
                limit,
                reply,
            } => {
                let mut jobs: Vec<Job> = state
                    .jobs
                    .values()
                    .filter(|j| {
                        status_filter
                            .as_ref()
                            .is_none_or(|s| j.status.as_str() == s)
                    })
                    .cloned()
                    .collect();
                jobs.sort_by_key(|j| j.created_at);
                jobs.truncate(limit);
                let _ = reply.send(jobs);
            }

            QueueMessage::GetInfo { reply } => {
                let _ = reply.send(state.info());
            }

            QueueMessage::GetStats { reply } => {
                let _ = reply.send(state.stats());
            }

            QueueMessage::Shutdown => {
                tracing::info!("Shutting down queue: {}", state.operation);
                myself.stop(None);
            }
        }

        Ok(())
    }
}
