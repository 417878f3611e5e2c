use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{Id as TaskId, JoinSet};

use crate::classify::ERROR_MODEL;
use crate::config::ProbeConfig;
use crate::dispatch::ChatRequest;
use crate::dispatch::http::ChatClient;
use crate::error::ProbeError;

/// Longest error message kept on a failed outcome.
pub const MAX_ERROR_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl OutcomeStatus {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Failure => "✗",
        }
    }
}

/// Result of one request in a burst.
#[derive(Debug, Clone)]
pub struct BurstOutcome {
    pub seq: usize,
    pub status: OutcomeStatus,
    /// Model id the proxy reported, or [`ERROR_MODEL`] on failure.
    pub model: String,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl BurstOutcome {
    pub fn success(seq: usize, model: String, elapsed: Duration) -> Self {
        Self {
            seq,
            status: OutcomeStatus::Success,
            model,
            elapsed,
            error: None,
        }
    }

    pub fn failure(seq: usize, elapsed: Duration, err: &ProbeError) -> Self {
        Self {
            seq,
            status: OutcomeStatus::Failure,
            model: ERROR_MODEL.to_string(),
            elapsed,
            error: Some(err.short_message(MAX_ERROR_CHARS)),
        }
    }
}

/// Fires a burst of identical-model requests at the proxy and collects one
/// outcome per request, sorted by sequence number.
///
/// Every request runs in its own task. A semaphore caps how many are in
/// flight; with the default pool size equal to the request count nothing
/// ever waits for a permit.
pub struct BurstExecutor {
    client: ChatClient,
    config: Arc<ProbeConfig>,
}

impl BurstExecutor {
    pub fn new(client: ChatClient, config: Arc<ProbeConfig>) -> Self {
        Self { client, config }
    }

    pub async fn execute(&self) -> Vec<BurstOutcome> {
        self.execute_with(|client, seq, req| async move {
            dispatch_one(&client, seq, &req).await
        })
        .await
    }

    /// Fan-out/fan-in around an arbitrary per-request task body.
    /// `run` builds the future for one request; it is not polled until the
    /// task holds a pool permit.
    pub(crate) async fn execute_with<F, Fut>(&self, run: F) -> Vec<BurstOutcome>
    where
        F: Fn(ChatClient, usize, ChatRequest) -> Fut,
        Fut: Future<Output = BurstOutcome> + Send + 'static,
    {
        let burst = &self.config.burst;
        let start = Instant::now();
        let pool = Arc::new(Semaphore::new(burst.concurrency));

        tracing::info!(
            requests = burst.requests,
            pool = burst.concurrency,
            model = %self.config.model,
            "dispatching burst"
        );

        let mut set = JoinSet::new();
        // Task ID → sequence number, so a panicked task still yields a record.
        let mut task_seq: HashMap<TaskId, usize> = HashMap::new();

        for seq in 1..=burst.requests {
            let pool = pool.clone();
            let req = ChatRequest::user(&self.config.model, burst.prompt_for(seq), burst.max_tokens);
            let task = run(self.client.clone(), seq, req);

            let handle = set.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it were.
                let _permit = pool.acquire_owned().await.ok();
                task.await
            });
            task_seq.insert(handle.id(), seq);
        }

        let mut outcomes = Vec::with_capacity(burst.requests);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_err) => match task_seq.get(&join_err.id()) {
                    Some(&seq) => {
                        tracing::error!(seq, "burst task failed: {join_err}");
                        outcomes.push(BurstOutcome::failure(
                            seq,
                            start.elapsed(),
                            &ProbeError::Panicked(join_err.to_string()),
                        ));
                    }
                    None => tracing::error!("burst task with unknown id failed: {join_err}"),
                },
            }
        }

        // One record per request, even if a task could not be attributed.
        let recorded: HashSet<usize> = outcomes.iter().map(|o| o.seq).collect();
        for seq in (1..=burst.requests).filter(|s| !recorded.contains(s)) {
            tracing::error!(seq, "no result recorded for request");
            outcomes.push(BurstOutcome::failure(
                seq,
                start.elapsed(),
                &ProbeError::Panicked("no result recorded".to_string()),
            ));
        }

        outcomes.sort_by_key(|o| o.seq);

        tracing::info!(
            completed = outcomes.len(),
            failed = outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Failure)
                .count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "burst finished"
        );

        outcomes
    }
}

/// Time and send one request, turning any error into a failure record.
pub async fn dispatch_one(client: &ChatClient, seq: usize, req: &ChatRequest) -> BurstOutcome {
    let start = Instant::now();
    match client.chat_completion(req).await {
        Ok(response) => BurstOutcome::success(seq, response.completion.model, start.elapsed()),
        Err(e) => {
            tracing::warn!(seq, "request failed: {e}");
            BurstOutcome::failure(seq, start.elapsed(), &e)
        }
    }
}
