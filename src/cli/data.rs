use crate::cli::DataArgs;
use crate::config::Config;
use crate::formatter::Format;
use crate::sources;
use anyhow::{Context, Result};

/// Handle data command
pub async fn handle(cmd: &DataArgs, config: &Config) -> Result<()> {
    let registry = sources::registry_from_config(config)?;
    registry.initialize(&cmd.source).await?;

    let result = registry
        .fetch_data(&cmd.source, cmd.count, cmd.topic_id)
        .await
        .with_context(|| {
            format!(
                "Failed to fetch data for topic {} from '{}'",
                cmd.topic_id, cmd.source
            )
        });
    registry.shutdown().await;

    let data = result?;
    print!("{}", Format::from_string(&cmd.format).render_data(&cmd.source, cmd.topic_id, &data)?);
    Ok(())
}
