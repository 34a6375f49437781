use crate::errors::RecorderError;
use crate::policy::standard::StandardPolicy;
use crate::policy::{RecordingContext, RecordingPolicy};
use crate::types::{BufferKind, PolicyKind};

/// Standard routing, plus every recurring progress line committed to the
/// trace log as it arrives.
pub struct TracePolicy;

impl RecordingPolicy for TracePolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Trace
    }

    fn on_recurring(
        &self,
        ctx: &mut RecordingContext<'_>,
        progress: &str,
    ) -> Result<(), RecorderError> {
        let routing = ctx.routing;
        ctx.append(BufferKind::Trace, progress);
        ctx.flush(BufferKind::Trace, routing.trace_only())
    }

    fn on_final(&self, ctx: &mut RecordingContext<'_>) -> Result<(), RecorderError> {
        StandardPolicy.on_final(ctx)
    }

    fn on_specified(
        &self,
        ctx: &mut RecordingContext<'_>,
        text: &str,
    ) -> Result<(), RecorderError> {
        StandardPolicy.on_specified(ctx, text)
    }
}
