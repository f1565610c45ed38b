/// Lifecycle of a single track.
///
/// Transitions only move forward: `Tentative -> Confirmed -> Deleted` or
/// `Tentative -> Deleted`. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// Newly created, not yet backed by `n_init` hits
    #[default]
    Tentative,
    /// Enough evidence collected
    Confirmed,
    /// Dead; removed from the active set in the same frame
    Deleted,
}
