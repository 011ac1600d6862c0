// src/task/comment.rs

use serde::Deserialize;

use super::ExecutionContext;

/// Appends its text to the build log.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CommentTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub text: String,
}

impl CommentTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            name: None,
            text: text.into(),
        }
    }

    pub fn run(&self, context: &mut ExecutionContext) {
        context.add_log(self.text.clone());
    }
}

/// Placeholder that does nothing.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NullTask {
    #[serde(default)]
    pub name: Option<String>,
}

impl NullTask {
    pub fn run(&self, context: &mut ExecutionContext) {
        context.add_log("Doing nothing");
    }
}
