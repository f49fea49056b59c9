//! Agent seams for the three pipeline points (spec §4.8): pre-search and
//! post-search agents run sequentially and mutate the context in place;
//! response agents run in parallel and only ever contribute an artifact,
//! never touch the answer itself.

use std::time::Duration;

use async_trait::async_trait;
use ragcore_core::{Error, SearchContext};
use serde_json::Value;

#[async_trait]
pub trait SequentialAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn run(&self, ctx: &mut SearchContext) -> Result<(), Error>;
}

#[async_trait]
pub trait ResponseAgent: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Reads the finished context and produces an artifact value; never
    /// mutates the answer.
    async fn run(&self, ctx: &SearchContext) -> Result<Value, Error>;
}
