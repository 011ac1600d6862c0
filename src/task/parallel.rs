// src/task/parallel.rs

use futures::future::join_all;
use serde::Deserialize;
use tracing::info;

use super::driver::run_task_tree_boxed;
use super::{ExecutionContext, Task, TaskEnvironment};

/// Runs its children concurrently and waits for all of them.
///
/// Every child gets a forked context. Once all are done their statuses are
/// folded in (most severe wins) and their logs are appended in declaration
/// order.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParallelTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ParallelTask {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { name: None, tasks }
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) {
        if self.tasks.is_empty() {
            context.add_log("Parallel task has no tasks to run");
            return;
        }

        let mut forks: Vec<ExecutionContext> = self.tasks.iter().map(|_| context.fork()).collect();
        let runs = self
            .tasks
            .iter()
            .zip(forks.iter_mut())
            .map(|(task, fork)| run_task_tree_boxed(task, fork, env));
        join_all(runs).await;

        let failed = forks.iter().filter(|f| f.status().is_failed()).count();
        let succeeded = forks.len() - failed;
        for fork in forks {
            context.merge(fork);
        }

        info!(
            project = %env.project_name,
            succeeded,
            failed,
            "parallel tasks finished"
        );
        context.add_log(format!(
            "Parallel task completed: {succeeded} successful, {failed} failed"
        ));
    }
}
