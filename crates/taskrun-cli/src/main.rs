use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskrun_core::app::current_run;
use taskrun_core::domain::{ProcessorError, WarehouseId};
use taskrun_core::ports::{IdGenerator, SystemClock, UlidGenerator};
use taskrun_core::{
    ExecutorBuilder, ExecutorConfig, RunContext, TaskRun, TaskRunProcessor, TaskRunState,
    TaskRunStatus,
};

/// Submit a few demo task runs and print their persisted status.
///
/// Pool sizing comes from `TASKRUN_*` environment variables (or `.env`);
/// flags given on the command line take precedence.
#[derive(Parser, Debug)]
#[command(name = "taskrun", version, about)]
struct Cli {
    /// Number of pool workers (0 = available parallelism).
    #[arg(long)]
    max_threads: Option<usize>,

    /// Jobs allowed to wait for a free worker.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Pool name used in logs.
    #[arg(long)]
    pool_name: Option<String>,

    /// Warehouse the demo runs execute under.
    #[arg(long, default_value_t = 0)]
    warehouse: u64,
}

/// refresh: 少し待ってから成功する
struct RefreshProcessor {
    delay: Duration,
}

#[async_trait]
impl TaskRunProcessor for RefreshProcessor {
    async fn process(&self, ctx: &RunContext) -> Result<TaskRunState, ProcessorError> {
        tokio::time::sleep(self.delay).await;
        let on = current_run().map(|c| c.warehouse_id()).unwrap_or(ctx.warehouse_id());
        info!(task_name = ctx.task_name(), warehouse = %on, "refreshed");
        Ok(TaskRunState::Success)
    }
}

/// broken: 常に失敗する
struct BrokenProcessor;

#[async_trait]
impl TaskRunProcessor for BrokenProcessor {
    async fn process(&self, _ctx: &RunContext) -> Result<TaskRunState, ProcessorError> {
        Err(ProcessorError::new("disk full"))
    }
}

fn make_run(
    ids: &impl IdGenerator,
    warehouse: WarehouseId,
    name: &str,
    processor: Arc<dyn TaskRunProcessor>,
) -> Arc<TaskRun> {
    let status = Arc::new(TaskRunStatus::new(
        ids.generate_task_id(),
        name,
        ids.generate_query_id(),
    ));
    let ctx = RunContext::new(warehouse, name).with_query_id(status.query_id());
    Arc::new(TaskRun::new(status, ctx, processor))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ExecutorConfig::from_env()?;
    if let Some(max_threads) = cli.max_threads {
        config.max_task_runs_threads_num = max_threads;
    }
    if let Some(queue_capacity) = cli.queue_capacity {
        config.queue_capacity = queue_capacity;
    }
    if let Some(pool_name) = cli.pool_name {
        config.pool_name = pool_name;
    }

    let dispatcher = ExecutorBuilder::new(config).build()?;
    let ids = UlidGenerator::new(SystemClock);
    let warehouse = WarehouseId::new(cli.warehouse);

    let runs = vec![
        make_run(
            &ids,
            warehouse,
            "mv_refresh",
            Arc::new(RefreshProcessor {
                delay: Duration::from_millis(50),
            }),
        ),
        make_run(&ids, warehouse, "broken_load", Arc::new(BrokenProcessor)),
    ];

    for run in &runs {
        let accepted = dispatcher.submit(Some(Arc::clone(run)));
        info!(task_name = run.run_ctx().task_name(), accepted, "submitted");
    }

    // 同じ run の再投入は拒否される
    let again = dispatcher.submit(Some(Arc::clone(&runs[0])));
    info!(accepted = again, "resubmitted mv_refresh");

    for run in &runs {
        let completion = run.completion().wait().await;
        info!(task_name = run.run_ctx().task_name(), ?completion, "completed");
        if let Some(status) = run.status() {
            println!("{}", status.to_json()?);
        }
    }

    println!("{}", serde_json::to_string(&dispatcher.pool().stats())?);
    dispatcher.shutdown().await;
    Ok(())
}
