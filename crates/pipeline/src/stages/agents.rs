//! Thin `PipelineStage` wrappers around `AgentExecutor`'s three dispatch
//! points (spec §4.1 stages 3, 6, 9 / spec §4.8). The executor already
//! records failures into `agent_summary` without aborting, so these stages
//! never return `StageOutcome::Abort`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragcore_agents::AgentExecutor;
use ragcore_core::SearchContext;

use crate::stage::{PipelineStage, StageOutcome};

pub struct PreSearchAgentsStage {
    executor: Arc<AgentExecutor>,
}

impl PreSearchAgentsStage {
    pub fn new(executor: Arc<AgentExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl PipelineStage for PreSearchAgentsStage {
    fn name(&self) -> &str {
        "pre_search_agents"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        self.executor.run_pre_search(&mut ctx).await;
        StageOutcome::Continue(ctx)
    }
}

pub struct PostSearchAgentsStage {
    executor: Arc<AgentExecutor>,
}

impl PostSearchAgentsStage {
    pub fn new(executor: Arc<AgentExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl PipelineStage for PostSearchAgentsStage {
    fn name(&self) -> &str {
        "post_search_agents"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        self.executor.run_post_search(&mut ctx).await;
        StageOutcome::Continue(ctx)
    }
}

pub struct ResponseAgentsStage {
    executor: Arc<AgentExecutor>,
    deadline: Duration,
}

impl ResponseAgentsStage {
    pub fn new(executor: Arc<AgentExecutor>, deadline: Duration) -> Self {
        Self { executor, deadline }
    }
}

#[async_trait]
impl PipelineStage for ResponseAgentsStage {
    fn name(&self) -> &str {
        "response_agents"
    }

    async fn execute(&self, mut ctx: SearchContext) -> StageOutcome {
        self.executor.run_response(&mut ctx, self.deadline).await;
        StageOutcome::Continue(ctx)
    }
}
