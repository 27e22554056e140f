//! Manual smoke-test for `taskqueue-core` + `taskqueue-sqlite`.
//!
//! No adapters, no ceremony: build a store, build a `Dispatcher`, submit a
//! few tasks, watch them drain. Not part of the library's programmatic
//! surface — just a CLI harness for exercising the whole stack end to end.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use taskqueue_core::{
    Dispatcher, DispatcherBuilder, Outcome, SchedulerConfig, SchedulerError, TaskExecutor, TaskHandle, TaskKind,
};
use taskqueue_sqlite::SqliteStore;

#[derive(Debug, Serialize, Deserialize)]
struct GreetTask {
    name: String,
    fail: bool,
}

struct GreetExecutor;

#[async_trait]
impl TaskExecutor for GreetExecutor {
    async fn run(&self, payload_blob: &[u8], _handle: Arc<TaskHandle>) -> taskqueue_core::Result<Outcome> {
        let task: GreetTask = serde_json::from_slice(payload_blob)
            .map_err(|e| SchedulerError::DecodeFailure(e.to_string()))?;

        if task.fail {
            return Ok(Outcome::Failed {
                reason: format!("{} asked to fail", task.name),
                exception_blob: None,
            });
        }

        println!("hello, {}!", task.name);
        Ok(Outcome::Success)
    }
}

async fn wait_for_drain(dispatcher: &Arc<Dispatcher>) -> Result<()> {
    for _ in 0..50 {
        let remaining = dispatcher.tasks(TaskKind::All).await?;
        if remaining.is_empty() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await?);
    let dispatcher = DispatcherBuilder::new(store, Arc::new(GreetExecutor))
        .with_config(SchedulerConfig::default())
        .build();

    dispatcher.register_task_listener(Arc::new(taskqueue_core::audit::AuditLog));

    dispatcher
        .submit("greetings", 0, serde_json::to_vec(&GreetTask { name: "ada".into(), fail: false })?)
        .await?;
    dispatcher
        .submit("greetings", 0, serde_json::to_vec(&GreetTask { name: "grace".into(), fail: true })?)
        .await?;
    dispatcher.submit("greetings", 0, b"not json at all".to_vec()).await?;

    wait_for_drain(&dispatcher).await?;

    let failed = dispatcher.tasks(TaskKind::Failed).await?;
    println!("{} task(s) ended up in the Failed cursor", failed.len());
    for task in failed {
        println!("  - #{}: {}", task.id, task.failure_reason.unwrap_or_default());
    }

    Ok(())
}
