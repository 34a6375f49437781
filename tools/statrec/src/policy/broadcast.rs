use crate::errors::RecorderError;
use crate::policy::{RecordingContext, RecordingPolicy};
use crate::types::{BufferKind, PolicyKind};

/// Sends the header and every result to all destinations. Recurring progress
/// is gathered in the summary buffer and written once, at finalization.
pub struct BroadcastPolicy;

impl RecordingPolicy for BroadcastPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Broadcast
    }

    fn on_initial(
        &self,
        ctx: &mut RecordingContext<'_>,
        _header_start: usize,
    ) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.flush(BufferKind::Statistics, routing.all())
    }

    fn on_recurring(
        &self,
        ctx: &mut RecordingContext<'_>,
        progress: &str,
    ) -> Result<(), RecorderError> {
        ctx.append(BufferKind::Summary, progress);
        Ok(())
    }

    fn on_final(&self, ctx: &mut RecordingContext<'_>) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.flush(BufferKind::Summary, routing.summary_only())?;
        ctx.flush(BufferKind::Statistics, routing.all())
    }

    fn on_specified(
        &self,
        ctx: &mut RecordingContext<'_>,
        text: &str,
    ) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.append(BufferKind::Statistics, text);
        ctx.flush(BufferKind::Statistics, routing.all())
    }
}
