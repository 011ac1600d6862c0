// src/trigger/force.rs

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::clock::Clock;
use crate::types::{BuildCondition, IntegrationRequest};

/// Shared one-shot flag set by a force-build request and consumed by the
/// next poll of the owning [`ForceTrigger`].
#[derive(Debug, Clone, Default)]
pub struct ForceFlag {
    requested_by: Arc<Mutex<Option<String>>>,
}

impl ForceFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. A second request before the next poll is merged into
    /// the first.
    pub fn request(&self, requested_by: impl Into<String>) {
        let mut slot = self.requested_by.lock();
        if slot.is_none() {
            *slot = Some(requested_by.into());
        }
    }

    pub fn is_set(&self) -> bool {
        self.requested_by.lock().is_some()
    }

    pub fn take(&self) -> Option<String> {
        self.requested_by.lock().take()
    }
}

/// Fires once per raised [`ForceFlag`].
#[derive(Debug, Clone, Default)]
pub struct ForceTrigger {
    name: Option<String>,
    flag: ForceFlag,
}

impl ForceTrigger {
    pub const DEFAULT_NAME: &'static str = "ForceBuild";

    pub fn new(flag: ForceFlag) -> Self {
        Self { name: None, flag }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }

    pub fn flag(&self) -> &ForceFlag {
        &self.flag
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let requested_by = self.flag.take()?;
        info!(trigger = %self.name(), requested_by = %requested_by, "force build requested");
        Some(IntegrationRequest::new(self.name(), clock.now()).with_condition(BuildCondition::ForceBuild))
    }

    /// Drop any request that arrived after the last poll.
    pub fn clean_up(&mut self) {
        self.flag.take();
    }
}
