//! Per-call deadline policy.
//!
//! # Design
//! The governor is the only place that decides whether a call gets a
//! deadline: never when the configured timeout is zero, never for call
//! kinds outside `restricted_methods`. When a deadline elapses it logs the
//! configured message, aborts the transport task (errors from `abort` are
//! swallowed, the task may have finished already) and then runs the
//! caller's expiry hook, which routes the failure into the call.

use std::sync::Arc;

use crate::config::RequestConfig;
use crate::host::TransportTask;
use crate::timer::{Timer, TimerHandle};
use crate::types::MethodKind;

pub struct TimeoutGovernor {
    config: RequestConfig,
    timer: Arc<dyn Timer>,
}

impl TimeoutGovernor {
    pub fn new(config: RequestConfig, timer: Arc<dyn Timer>) -> Self {
        Self { config, timer }
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Arm a deadline for one call, or return `None` if no deadline applies.
    pub fn start_timer(
        &self,
        kind: MethodKind,
        task: Arc<dyn TransportTask>,
        on_expire: impl FnOnce() + Send + 'static,
    ) -> Option<TimerHandle> {
        if !self.config.applies_to(kind) {
            return None;
        }
        let timeout = self.config.timeout();
        let message = self.config.timeout_message().to_string();
        let handle = TimerHandle::new(move || {
            tracing::warn!(method = %kind, timeout_ms = timeout.as_millis() as u64, "{message}");
            if let Err(err) = task.abort() {
                tracing::debug!(method = %kind, error = %err, "abort after deadline failed");
            }
            on_expire();
        });
        self.timer.schedule(timeout, handle.clone());
        Some(handle)
    }

    /// Disarm a deadline. No-op for `None` or a handle that already fired.
    pub fn clear_timer(&self, handle: Option<&TimerHandle>) {
        if let Some(handle) = handle {
            handle.cancel();
        }
    }
}
