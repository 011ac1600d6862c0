// src/task/sequence.rs

use serde::Deserialize;

use super::{ChildTasks, Children, ExecutionContext, Task};

/// Runs its children in declaration order.
///
/// A failing child does not stop its siblings unless `abort_on_failure` is
/// set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SequenceTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub abort_on_failure: bool,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl SequenceTask {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            name: None,
            abort_on_failure: false,
            tasks,
        }
    }

    pub fn aborting(mut self) -> Self {
        self.abort_on_failure = true;
        self
    }

    pub fn run<'a>(&'a self, context: &mut ExecutionContext) -> Children<'a> {
        if self.tasks.is_empty() {
            context.add_log("Sequence has no tasks to run");
            return None;
        }
        Some(Box::new(SequenceCursor::new(&self.tasks, self.abort_on_failure)))
    }
}

/// Yields a slice of tasks in order.
pub(super) struct SequenceCursor<'a> {
    remaining: std::slice::Iter<'a, Task>,
    abort_on_failure: bool,
}

impl<'a> SequenceCursor<'a> {
    pub(super) fn new(tasks: &'a [Task], abort_on_failure: bool) -> Self {
        Self {
            remaining: tasks.iter(),
            abort_on_failure,
        }
    }
}

impl<'a> ChildTasks<'a> for SequenceCursor<'a> {
    fn next_child(&mut self, context: &ExecutionContext) -> Option<&'a Task> {
        if self.abort_on_failure && context.status().is_failed() {
            return None;
        }
        self.remaining.next()
    }
}
