//! Relay status command: print the codex device-auth state.

use anyhow::Result;
use relay_core::DeviceAuth;

/// Run the status command
pub async fn run() -> Result<()> {
    let auth = DeviceAuth::default();
    let snapshot = auth.status().await;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
