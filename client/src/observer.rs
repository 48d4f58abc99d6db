//! Outside listeners notified when a playthrough settles.

/// Hooks into the surrounding application. All methods default to no-ops.
pub trait Observer: Send + Sync + 'static {
    /// The character woke up (successful exit).
    fn awaken(&self, _character: u32) {}

    /// A playthrough reached a settled verdict.
    fn game_complete(&self) {}

    /// Standings changed on chain and should be re-read.
    fn standings_refresh(&self) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
