use crate::buffers::BufferStore;
use crate::errors::RecorderError;
use crate::gateway;
use crate::logging::{JsonlLogger, EVENT_COMMIT, EVENT_COMMIT_FAILED};
use crate::routing::{DestinationGroup, RoutingTable};
use crate::runtime::Persistence;
use crate::types::{BufferKind, PolicyKind};
use serde_json::json;

pub mod broadcast;
pub mod factory;
pub mod standard;
pub mod trace;

/// What a policy may touch while the session lock is held.
pub struct RecordingContext<'a> {
    buffers: &'a mut BufferStore,
    pub routing: &'a RoutingTable,
    persistence: &'a dyn Persistence,
    logger: Option<&'a JsonlLogger>,
}

impl<'a> RecordingContext<'a> {
    pub fn new(
        buffers: &'a mut BufferStore,
        routing: &'a RoutingTable,
        persistence: &'a dyn Persistence,
        logger: Option<&'a JsonlLogger>,
    ) -> Self {
        Self {
            buffers,
            routing,
            persistence,
            logger,
        }
    }

    pub fn append(&mut self, buffer: BufferKind, text: &str) {
        self.buffers.append(buffer, text);
    }

    pub fn reset(&mut self, buffer: BufferKind) {
        self.buffers.reset(buffer);
    }

    pub fn truncate(&mut self, buffer: BufferKind, len: usize) {
        self.buffers.truncate(buffer, len);
    }

    pub fn snapshot(&self, buffer: BufferKind) -> &str {
        self.buffers.snapshot(buffer)
    }

    /// Commits the buffer to `group` and resets it. On failure the buffer is
    /// left intact so a later flush can deliver it.
    pub fn flush(
        &mut self,
        buffer: BufferKind,
        group: &DestinationGroup,
    ) -> Result<(), RecorderError> {
        let text = self.buffers.snapshot(buffer);
        let bytes = text.len();
        match gateway::commit(self.persistence, group, text) {
            Ok(()) => {
                self.buffers.reset(buffer);
                if let Some(logger) = self.logger {
                    logger.emit(
                        "info",
                        EVENT_COMMIT,
                        json!({
                            "buffer": buffer.as_str(),
                            "group": group.name(),
                            "destinations": group.label(),
                            "bytes": bytes,
                        }),
                    );
                }
                Ok(())
            }
            Err(err) => {
                if let Some(logger) = self.logger {
                    logger.emit(
                        "error",
                        EVENT_COMMIT_FAILED,
                        json!({
                            "buffer": buffer.as_str(),
                            "group": group.name(),
                            "destinations": group.label(),
                            "bytes": bytes,
                            "error": err.to_string(),
                        }),
                    );
                }
                Err(err)
            }
        }
    }
}

/// Decides which buffers are committed where, and when. The session calls
/// these hooks with its lock held.
pub trait RecordingPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// Runs after the header has been appended to the statistics buffer at
    /// byte offset `header_start`. Text before that offset belongs to earlier
    /// callers. The default discards only the header, without persisting.
    fn on_initial(
        &self,
        ctx: &mut RecordingContext<'_>,
        header_start: usize,
    ) -> Result<(), RecorderError> {
        ctx.truncate(BufferKind::Statistics, header_start);
        Ok(())
    }

    fn on_recurring(
        &self,
        ctx: &mut RecordingContext<'_>,
        progress: &str,
    ) -> Result<(), RecorderError>;

    fn on_final(&self, _ctx: &mut RecordingContext<'_>) -> Result<(), RecorderError> {
        Ok(())
    }

    fn on_specified(&self, ctx: &mut RecordingContext<'_>, text: &str)
        -> Result<(), RecorderError>;
}

#[cfg(test)]
mod tests {
    use super::{RecordingContext, RecordingPolicy};
    use crate::buffers::BufferStore;
    use crate::errors::RecorderError;
    use crate::routing::RoutingTable;
    use crate::runtime::FakePersistence;
    use crate::types::{BufferKind, PolicyKind};

    struct HooksOnly;

    impl RecordingPolicy for HooksOnly {
        fn kind(&self) -> PolicyKind {
            PolicyKind::Standard
        }

        fn on_recurring(
            &self,
            _ctx: &mut RecordingContext<'_>,
            _progress: &str,
        ) -> Result<(), RecorderError> {
            Ok(())
        }

        fn on_specified(
            &self,
            ctx: &mut RecordingContext<'_>,
            text: &str,
        ) -> Result<(), RecorderError> {
            ctx.append(BufferKind::Result, text);
            Ok(())
        }
    }

    #[test]
    fn default_hooks_discard_header_and_commit_nothing() {
        let mut buffers = BufferStore::new();
        let routing = RoutingTable::new();
        let fake = FakePersistence::default();
        buffers.append(BufferKind::Statistics, "header");

        let mut ctx = RecordingContext::new(&mut buffers, &routing, &fake, None);
        HooksOnly.on_initial(&mut ctx, 0).expect("initial");
        HooksOnly.on_final(&mut ctx).expect("final");
        assert_eq!(ctx.snapshot(BufferKind::Statistics), "");
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn default_initial_hook_keeps_text_appended_before_the_header() {
        let mut buffers = BufferStore::new();
        let routing = RoutingTable::new();
        let fake = FakePersistence::default();
        buffers.append(BufferKind::Statistics, "unsent row\n");
        let header_start = buffers.len(BufferKind::Statistics);
        buffers.append(BufferKind::Statistics, "HEADER\n");

        let mut ctx = RecordingContext::new(&mut buffers, &routing, &fake, None);
        HooksOnly.on_initial(&mut ctx, header_start).expect("initial");
        assert_eq!(ctx.snapshot(BufferKind::Statistics), "unsent row\n");
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn flush_resets_only_after_successful_commit() {
        let mut buffers = BufferStore::new();
        let routing = RoutingTable::new();
        let fake = FakePersistence::default();
        let mut ctx = RecordingContext::new(&mut buffers, &routing, &fake, None);
        ctx.append(BufferKind::Summary, "row\n");

        fake.set_fail_next(RecorderError::Io("busy".to_string()));
        let group = routing.summary_only();
        assert!(ctx.flush(BufferKind::Summary, group).is_err());
        assert_eq!(ctx.snapshot(BufferKind::Summary), "row\n");

        ctx.flush(BufferKind::Summary, group).expect("retry");
        assert_eq!(ctx.snapshot(BufferKind::Summary), "");
        assert_eq!(fake.calls().len(), 1);
        assert_eq!(fake.calls()[0].text, "row\n");
    }
}
