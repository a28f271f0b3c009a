use clap::Subcommand;

/// Promotional exposure caps.
#[derive(Clone, Debug, Subcommand)]
pub enum ExposureCommands {
    /// Check whether a slot may be shown now (does not count).
    Check {
        /// Placement slot, e.g. `plan` or `report`.
        slot: String,
    },
    /// Count one exposure that was actually shown.
    Record {
        /// Placement slot, e.g. `plan` or `report`.
        slot: String,
    },
    /// Show current day/week counters.
    Show,
}
