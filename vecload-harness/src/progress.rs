use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for durations too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 86_400);

/// How a timed wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Snapshot handed to the progress callback on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl Tick {
    /// Whole seconds left, counting down from the full duration at the first tick.
    pub fn remaining_secs(&self) -> u64 {
        (self.elapsed + self.remaining).as_secs().saturating_sub(self.elapsed.as_secs())
    }
}

/// Wait `duration`, calling `on_tick` immediately and then every `every`.
/// Returns early with [`WaitOutcome::Cancelled`] if `cancel` fires first.
pub async fn run_for(
    duration: Duration,
    every: Duration,
    cancel: &CancellationToken,
    mut on_tick: impl FnMut(Tick),
) -> WaitOutcome {
    let start = Instant::now();
    let deadline = start.checked_add(duration).unwrap_or_else(|| start + FAR_FUTURE);
    let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return WaitOutcome::Cancelled,
            _ = tokio::time::sleep_until(deadline) => return WaitOutcome::Elapsed,
            _ = interval.tick() => {
                let elapsed = start.elapsed();
                on_tick(Tick { elapsed, remaining: duration.saturating_sub(elapsed) });
            }
        }
    }
}

/// Drive `fut` to completion, calling `on_tick` with the elapsed time every `every`.
pub async fn report_while<F: Future>(fut: F, every: Duration, mut on_tick: impl FnMut(Duration)) -> F::Output {
    tokio::pin!(fut);
    let start = Instant::now();
    let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            out = &mut fut => return out,
            _ = interval.tick() => on_tick(start.elapsed()),
        }
    }
}

/// Overwrite the current terminal line with `line`.
pub fn print_inline(line: &str) {
    print!("\r{line}");
    std::io::stdout().flush().ok();
}
