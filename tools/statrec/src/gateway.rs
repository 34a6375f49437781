use crate::errors::RecorderError;
use crate::routing::DestinationGroup;
use crate::runtime::Persistence;

/// The only call site of the persistence collaborator. One write per call,
/// no retry; failures come back as `RecordingCommitFailed` with the cause.
pub fn commit(
    persistence: &dyn Persistence,
    group: &DestinationGroup,
    text: &str,
) -> Result<(), RecorderError> {
    persistence
        .write_to_file(group, text)
        .map_err(|source| RecorderError::commit_failed(group.label(), source))
}
