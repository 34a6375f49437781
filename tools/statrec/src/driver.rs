use crate::errors::RecorderError;
use crate::session::RecordingSession;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    pub workers: usize,
    pub iterations: usize,
    pub recurring_calls: usize,
}

/// A stand-in job: every worker reports progress each iteration and one
/// result line at the end, all through the shared session.
pub fn run_demo_job(
    session: &RecordingSession,
    workers: usize,
    iterations: usize,
) -> Result<DriverSummary, RecorderError> {
    let workers = workers.max(1);
    session.record_initial_data()?;

    let results = thread::scope(|scope| {
        let handles = (0..workers)
            .map(|idx| scope.spawn(move || run_worker(session, idx + 1, iterations)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(RecorderError::Collaborator("worker thread panicked".to_string()))
                })
            })
            .collect::<Vec<_>>()
    });
    for result in results {
        result?;
    }

    session.record_specified_data(&format!(
        "completed workers={workers} iterations={iterations} elapsed={}\n",
        session.elapsed()
    ))?;
    session.record_final_data()?;

    Ok(DriverSummary {
        workers,
        iterations,
        recurring_calls: workers * iterations,
    })
}

fn run_worker(
    session: &RecordingSession,
    worker: usize,
    iterations: usize,
) -> Result<(), RecorderError> {
    let mut best = u64::MAX;
    for iteration in 1..=iterations {
        best = best.min(score(worker, iteration));
        session.record_recurring_data(&format!(
            "worker-{worker} iteration={iteration} best={best}\n"
        ))?;
    }
    session.record_specified_data(&format!(
        "worker-{worker} finished at {} best={}\n",
        session.timestamp(),
        if best == u64::MAX { 0 } else { best }
    ))
}

fn score(worker: usize, iteration: usize) -> u64 {
    (1000 / iteration as u64).saturating_add(worker as u64)
}
