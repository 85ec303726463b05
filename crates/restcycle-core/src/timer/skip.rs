use serde::{Deserialize, Serialize};

/// Seconds a `Balanced` break must run before it may be skipped.
pub const BALANCED_SKIP_AFTER_SECS: u64 = 5;

/// How hard it is to bail out of a break early.
///
/// This is a policy check for the UI layer. `BreakCycle::skip_to_next` does
/// not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SkipDifficulty {
    /// Skip any time.
    Casual,
    /// Skip once the break has run for a few seconds.
    #[default]
    Balanced,
    /// Never skip.
    Hardcore,
}

impl SkipDifficulty {
    pub fn can_skip(self, break_elapsed_secs: u64) -> bool {
        match self {
            SkipDifficulty::Casual => true,
            SkipDifficulty::Balanced => break_elapsed_secs >= BALANCED_SKIP_AFTER_SECS,
            SkipDifficulty::Hardcore => false,
        }
    }
}
