//! Session state snapshot.

use crate::modes::ModeSpec;

/// A snapshot of a session's current state.
///
/// Use [`StripSession::state`](crate::StripSession::state) to obtain a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripState {
    /// The active mode and its settings.
    pub mode: ModeSpec,
    /// Length of the live buffer.
    pub length: u16,
    /// GetData requests not yet served by a read.
    pub pending_reads: usize,
}
