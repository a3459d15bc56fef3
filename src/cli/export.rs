use crate::core::{Dashboard, Period, ProviderError};
use anyhow::Result;
use tracing::warn;

/// Prints the flat `category -> symbol -> date -> value` view as JSON.
///
/// An unreachable provider degrades to an empty object so downstream
/// consumers always receive valid JSON.
pub async fn run(dashboard: &Dashboard, period: Period) -> Result<()> {
    let flat = match dashboard.flat_view(period).await {
        Ok(flat) => flat,
        Err(ProviderError::Unavailable(reason)) => {
            warn!(%reason, "Provider unreachable; exporting empty view");
            Default::default()
        }
    };

    println!("{}", serde_json::to_string_pretty(&flat)?);
    Ok(())
}
