// src/task/driver.rs

//! Depth-first driver for the task tree.

use tracing::{debug, error};

use super::{ChildTasks, Children, ExecutionContext, Task, TaskEnvironment};
use crate::types::{BoxFuture, IntegrationStatus};

/// Run `root` and everything it yields, depth-first.
///
/// Each child runs to completion before its parent's cursor is asked for
/// the next one. An error raised by a task marks the run as `Exception`,
/// is written to the build log and does not stop the remaining tasks.
pub async fn run_task_tree<'a>(
    root: &'a Task,
    context: &mut ExecutionContext,
    env: &TaskEnvironment<'_>,
) {
    let mut stack: Vec<Box<dyn ChildTasks<'a> + 'a>> = Vec::new();

    if let Some(children) = run_one(root, context, env).await {
        stack.push(children);
    }

    while let Some(cursor) = stack.last_mut() {
        match cursor.next_child(context) {
            Some(child) => {
                if let Some(children) = run_one(child, context, env).await {
                    stack.push(children);
                }
            }
            None => {
                stack.pop();
            }
        }
    }
}

async fn run_one<'a>(
    task: &'a Task,
    context: &mut ExecutionContext,
    env: &TaskEnvironment<'_>,
) -> Children<'a> {
    debug!(project = %env.project_name, task = %task.display_name(), "running task");

    match task.run(context, env).await {
        Ok(children) => children,
        Err(err) => {
            error!(
                project = %env.project_name,
                task = %task.display_name(),
                error = %format!("{err:#}"),
                "task raised an error"
            );
            context.add_log(format!(
                "Task '{}' failed with an error: {err:#}",
                task.display_name()
            ));
            context.set_status(IntegrationStatus::Exception);
            None
        }
    }
}

/// [`run_task_tree`] behind a named future type, for composite tasks that
/// drive whole subtrees themselves.
pub fn run_task_tree_boxed<'a>(
    root: &'a Task,
    context: &'a mut ExecutionContext,
    env: &'a TaskEnvironment<'_>,
) -> BoxFuture<'a, ()> {
    Box::pin(run_task_tree(root, context, env))
}
