use clap::{Args, Subcommand};

/// Authentication commands.
#[derive(Clone, Debug, Subcommand)]
pub enum AuthCommands {
    /// Show which credential source would be used.
    Status,
    /// Store a session token (keyring, falling back to ~/.almanac/credentials).
    SetToken(AuthSetTokenArgs),
    /// Clear stored credentials.
    Logout,
}

#[derive(Clone, Debug, Args)]
pub struct AuthSetTokenArgs {
    /// Session token to store.
    pub token: String,
}
