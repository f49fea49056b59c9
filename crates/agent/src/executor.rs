//! Stage dispatch (spec §4.8): pre-search and post-search agents run
//! sequentially in priority order; response agents run in parallel under a
//! shared deadline. Agent failures are recorded but never fail the
//! pipeline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use ragcore_core::context::{AgentRunResult, AgentRunStatus};
use ragcore_core::SearchContext;

use crate::traits::{ResponseAgent, SequentialAgent};

#[derive(Debug, Clone)]
pub enum ArtifactOutcome {
    Success(serde_json::Value),
    Failed(String),
    Timeout,
}

pub struct AgentExecutor {
    pre_search: Vec<Arc<dyn SequentialAgent>>,
    post_search: Vec<Arc<dyn SequentialAgent>>,
    response: Vec<Arc<dyn ResponseAgent>>,
}

impl Default for AgentExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentExecutor {
    pub fn new() -> Self {
        Self { pre_search: Vec::new(), post_search: Vec::new(), response: Vec::new() }
    }

    pub fn register_pre_search(&mut self, agent: Arc<dyn SequentialAgent>) {
        self.pre_search.push(agent);
        self.pre_search.sort_by_key(|a| a.priority());
    }

    pub fn register_post_search(&mut self, agent: Arc<dyn SequentialAgent>) {
        self.post_search.push(agent);
        self.post_search.sort_by_key(|a| a.priority());
    }

    pub fn register_response(&mut self, agent: Arc<dyn ResponseAgent>) {
        self.response.push(agent);
    }

    pub async fn run_pre_search(&self, ctx: &mut SearchContext) {
        run_sequential(&self.pre_search, ctx).await;
    }

    pub async fn run_post_search(&self, ctx: &mut SearchContext) {
        run_sequential(&self.post_search, ctx).await;
    }

    /// Runs all response agents concurrently, bounded by `deadline` across
    /// the whole fan-out (on top of each agent's own per-call timeout).
    /// Agents still running when the deadline elapses are recorded as
    /// `timeout` and omitted from the artifact set; the original answer is
    /// untouched regardless.
    pub async fn run_response(&self, ctx: &mut SearchContext, deadline: Duration) {
        if self.response.is_empty() {
            return;
        }

        let snapshot = Arc::new(ctx.clone());
        let slots: Arc<Mutex<Vec<Option<(String, ArtifactOutcome, u64)>>>> =
            Arc::new(Mutex::new(vec![None; self.response.len()]));

        let handles: Vec<_> = self
            .response
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, agent)| {
                let snapshot = snapshot.clone();
                let slots = slots.clone();
                tokio::spawn(async move {
                    let name = agent.name().to_string();
                    let start = Instant::now();
                    let outcome = match tokio::time::timeout(agent.timeout(), agent.run(&snapshot)).await {
                        Ok(Ok(value)) => ArtifactOutcome::Success(value),
                        Ok(Err(e)) => ArtifactOutcome::Failed(e.to_string()),
                        Err(_) => ArtifactOutcome::Timeout,
                    };
                    let elapsed = start.elapsed().as_millis() as u64;
                    slots.lock()[index] = Some((name, outcome, elapsed));
                })
            })
            .collect();

        let _ = tokio::time::timeout(deadline, futures::future::join_all(handles)).await;

        let slots = std::mem::take(&mut *slots.lock());
        for (index, slot) in slots.into_iter().enumerate() {
            let (name, outcome, elapsed_ms) = slot.unwrap_or_else(|| {
                (self.response[index].name().to_string(), ArtifactOutcome::Timeout, deadline.as_millis() as u64)
            });

            let status = match &outcome {
                ArtifactOutcome::Success(value) => {
                    ctx.artifacts.insert(name.clone(), value.clone());
                    AgentRunStatus::Success
                }
                ArtifactOutcome::Failed(err) => {
                    tracing::warn!(agent = %name, error = %err, "response agent failed");
                    AgentRunStatus::Failed
                }
                ArtifactOutcome::Timeout => {
                    tracing::warn!(agent = %name, "response agent timed out");
                    AgentRunStatus::Timeout
                }
            };

            ctx.agent_summary.record(AgentRunResult { agent_name: name, status, execution_time_ms: elapsed_ms });
        }
    }
}

async fn run_sequential(agents: &[Arc<dyn SequentialAgent>], ctx: &mut SearchContext) {
    for agent in agents {
        let start = Instant::now();
        let result = tokio::time::timeout(agent.timeout(), agent.run(ctx)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let status = match result {
            Ok(Ok(())) => AgentRunStatus::Success,
            Ok(Err(err)) => {
                tracing::warn!(agent = agent.name(), error = %err, "sequential agent failed");
                AgentRunStatus::Failed
            }
            Err(_) => {
                tracing::warn!(agent = agent.name(), "sequential agent timed out");
                AgentRunStatus::Timeout
            }
        };

        ctx.agent_summary.record(AgentRunResult {
            agent_name: agent.name().to_string(),
            status,
            execution_time_ms: elapsed_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragcore_core::Error;
    use uuid::Uuid;

    struct QueryPrefixer;

    #[async_trait]
    impl SequentialAgent for QueryPrefixer {
        fn name(&self) -> &str {
            "query_prefixer"
        }
        async fn run(&self, ctx: &mut SearchContext) -> Result<(), Error> {
            ctx.rewritten_query = Some(format!("enhanced: {}", ctx.question));
            Ok(())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl SequentialAgent for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn priority(&self) -> i32 {
            -1
        }
        async fn run(&self, _ctx: &mut SearchContext) -> Result<(), Error> {
            Err(Error::Internal("boom".into()))
        }
    }

    struct ArtifactProducer(&'static str);

    #[async_trait]
    impl ResponseAgent for ArtifactProducer {
        fn name(&self) -> &str {
            self.0
        }
        async fn run(&self, _ctx: &SearchContext) -> Result<serde_json::Value, Error> {
            Ok(serde_json::json!({ "produced_by": self.0 }))
        }
    }

    struct NeverFinishes;

    #[async_trait]
    impl ResponseAgent for NeverFinishes {
        fn name(&self) -> &str {
            "never_finishes"
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(60)
        }
        async fn run(&self, _ctx: &SearchContext) -> Result<serde_json::Value, Error> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(serde_json::Value::Null)
        }
    }

    fn ctx() -> SearchContext {
        SearchContext::new("r1".into(), "what is the refund policy".into(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[tokio::test]
    async fn pre_search_runs_in_priority_order_and_failures_dont_stop_the_chain() {
        let mut executor = AgentExecutor::new();
        executor.register_pre_search(Arc::new(QueryPrefixer));
        executor.register_pre_search(Arc::new(AlwaysFails));

        let mut c = ctx();
        executor.run_pre_search(&mut c).await;

        assert_eq!(c.rewritten_query.as_deref(), Some("enhanced: what is the refund policy"));
        assert_eq!(c.agent_summary.runs.len(), 2);
        assert_eq!(c.agent_summary.runs[0].agent_name, "always_fails");
        assert_eq!(c.agent_summary.succeeded(), 1);
        assert_eq!(c.agent_summary.failed(), 1);
    }

    #[tokio::test]
    async fn response_agents_run_concurrently_and_populate_artifacts() {
        let mut executor = AgentExecutor::new();
        executor.register_response(Arc::new(ArtifactProducer("summary")));
        executor.register_response(Arc::new(ArtifactProducer("related_questions")));

        let mut c = ctx();
        executor.run_response(&mut c, Duration::from_secs(5)).await;

        assert_eq!(c.artifacts.len(), 2);
        assert!(c.artifacts.contains_key("summary"));
        assert!(c.artifacts.contains_key("related_questions"));
        assert_eq!(c.agent_summary.succeeded(), 2);
    }

    #[tokio::test]
    async fn response_agent_past_the_enrichment_deadline_is_marked_timeout() {
        let mut executor = AgentExecutor::new();
        executor.register_response(Arc::new(ArtifactProducer("fast")));
        executor.register_response(Arc::new(NeverFinishes));

        let mut c = ctx();
        executor.run_response(&mut c, Duration::from_millis(50)).await;

        assert!(c.artifacts.contains_key("fast"));
        assert!(!c.artifacts.contains_key("never_finishes"));
        let slow_run = c.agent_summary.runs.iter().find(|r| r.agent_name == "never_finishes").unwrap();
        assert_eq!(slow_run.status, AgentRunStatus::Timeout);
    }
}
