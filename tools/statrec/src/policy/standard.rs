use crate::errors::RecorderError;
use crate::policy::{RecordingContext, RecordingPolicy};
use crate::types::{BufferKind, PolicyKind};

/// Statistics go to the results log on final and ad-hoc recording only.
pub struct StandardPolicy;

impl RecordingPolicy for StandardPolicy {
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

    fn on_final(&self, ctx: &mut RecordingContext<'_>) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.flush(BufferKind::Statistics, routing.results_only())
    }

    fn on_specified(
        &self,
        ctx: &mut RecordingContext<'_>,
        text: &str,
    ) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.append(BufferKind::Statistics, text);
        ctx.flush(BufferKind::Statistics, routing.results_only())
    }
}
