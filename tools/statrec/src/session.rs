//! One `RecordingSession` per job execution.
//!
//! Every lifecycle call runs start to finish under the session mutex, so an
//! append, its commit and the reset that follows are never split by another
//! caller. Worker threads share the session through an `Arc`.

use crate::buffers::BufferStore;
use crate::errors::RecorderError;
use crate::feedback::{self, ComposeInputs};
use crate::logging::{JsonlLogger, EVENT_INIT_FAILED, EVENT_OUT_OF_ORDER, EVENT_STAGE};
use crate::policy::{RecordingContext, RecordingPolicy};
use crate::routing::RoutingTable;
use crate::runtime::{Clock, Configuration, MemoryProbe, Persistence};
use crate::types::{BufferKind, RecorderStage, TimeFormat};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

#[derive(Clone)]
pub struct SessionCollaborators {
    pub configuration: Arc<dyn Configuration>,
    pub persistence: Arc<dyn Persistence>,
    pub clock: Arc<dyn Clock>,
    pub memory: Arc<dyn MemoryProbe>,
}

struct SessionState {
    buffers: BufferStore,
    stage: RecorderStage,
}

pub struct RecordingSession {
    state: Mutex<SessionState>,
    routing: RoutingTable,
    policy: Arc<dyn RecordingPolicy>,
    collaborators: SessionCollaborators,
    time_format: TimeFormat,
    started_at: SystemTime,
    logger: Option<JsonlLogger>,
}

impl RecordingSession {
    pub fn new(
        collaborators: SessionCollaborators,
        policy: Arc<dyn RecordingPolicy>,
        time_format: TimeFormat,
    ) -> Self {
        let started_at = collaborators.clock.now();
        Self {
            state: Mutex::new(SessionState {
                buffers: BufferStore::new(),
                stage: RecorderStage::Uninitialized,
            }),
            routing: RoutingTable::new(),
            policy,
            collaborators,
            time_format,
            started_at,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: JsonlLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Composes the run header into the statistics buffer and hands it to the
    /// policy. Composition failures leave the stage untouched.
    pub fn record_initial_data(&self) -> Result<(), RecorderError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let header = feedback::compose(&ComposeInputs {
            configuration: self.collaborators.configuration.as_ref(),
            clock: self.collaborators.clock.as_ref(),
            memory: self.collaborators.memory.as_ref(),
            time_format: self.time_format,
            started_at: self.started_at,
        })
        .map_err(|source| {
            self.log("error", EVENT_INIT_FAILED, json!({"error": source.to_string()}));
            RecorderError::init_failed(source)
        })?;

        let header_start = state.buffers.len(BufferKind::Statistics);
        state.buffers.append(BufferKind::Statistics, &header);
        let mut ctx = self.context(&mut state.buffers);
        self.policy.on_initial(&mut ctx, header_start)?;
        self.advance(state, RecorderStage::Initialized, &[RecorderStage::Uninitialized]);
        Ok(())
    }

    pub fn record_recurring_data(&self, progress: &str) -> Result<(), RecorderError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let progress = self.labelled(progress);

        let mut ctx = self.context(&mut state.buffers);
        self.policy.on_recurring(&mut ctx, &progress)?;
        self.advance(
            state,
            RecorderStage::Running,
            &[RecorderStage::Initialized, RecorderStage::Running],
        );
        Ok(())
    }

    /// Safe to repeat: buffers flushed by the first call are already empty.
    pub fn record_final_data(&self) -> Result<(), RecorderError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;

        let mut ctx = self.context(&mut state.buffers);
        self.policy.on_final(&mut ctx)?;
        self.advance(
            state,
            RecorderStage::Finalized,
            &[
                RecorderStage::Initialized,
                RecorderStage::Running,
                RecorderStage::Finalized,
            ],
        );
        Ok(())
    }

    /// Out-of-band text, committed immediately. Does not move the stage.
    pub fn record_specified_data(&self, text: &str) -> Result<(), RecorderError> {
        let mut guard = self.lock_state();
        let state = &mut *guard;
        let text = self.labelled(text);

        let mut ctx = self.context(&mut state.buffers);
        self.policy.on_specified(&mut ctx, &text)
    }

    pub fn stage(&self) -> RecorderStage {
        self.lock_state().stage
    }

    pub fn buffer_snapshot(&self, buffer: BufferKind) -> String {
        self.lock_state().buffers.snapshot(buffer).to_string()
    }

    /// Current time rendered with the session's time format.
    pub fn timestamp(&self) -> String {
        feedback::format_timestamp(
            self.collaborators.clock.now(),
            self.started_at,
            self.time_format,
        )
    }

    pub fn elapsed(&self) -> String {
        let now = self.collaborators.clock.now();
        feedback::format_elapsed(now.duration_since(self.started_at).unwrap_or_default())
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // Buffer operations cannot panic midway, so a poisoned state is still whole.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context<'a>(&'a self, buffers: &'a mut BufferStore) -> RecordingContext<'a> {
        RecordingContext::new(
            buffers,
            &self.routing,
            self.collaborators.persistence.as_ref(),
            self.logger.as_ref(),
        )
    }

    fn labelled(&self, text: &str) -> String {
        match self.collaborators.configuration.thread_label() {
            Some(label) => format!("[{label}] {text}"),
            None => text.to_string(),
        }
    }

    fn advance(&self, state: &mut SessionState, to: RecorderStage, expected: &[RecorderStage]) {
        let from = state.stage;
        if !expected.contains(&from) {
            self.log(
                "warn",
                EVENT_OUT_OF_ORDER,
                json!({"from": from.as_str(), "to": to.as_str()}),
            );
        }
        state.stage = to;
        if from != to {
            self.log(
                "info",
                EVENT_STAGE,
                json!({"from": from.as_str(), "to": to.as_str(), "policy": self.policy.kind().as_str()}),
            );
        }
    }

    fn log(&self, level: &str, event_type: &str, payload: serde_json::Value) {
        if let Some(logger) = &self.logger {
            logger.emit(level, event_type, payload);
        }
    }
}
