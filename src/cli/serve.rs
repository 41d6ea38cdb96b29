use crate::cli::ServeArgs;
use crate::config::Config;
use crate::server::{self, ServerConfig};
use crate::sources;
use anyhow::Result;

/// Handle serve command
pub async fn handle(cmd: &ServeArgs, config: &Config) -> Result<()> {
    let source_config = config
        .source(&cmd.source)
        .ok_or_else(|| anyhow::anyhow!("Data source '{}' is not configured", cmd.source))?;
    let timeout = config.timeout_for(source_config);
    let source = sources::build(source_config, timeout);

    let mut server_config = ServerConfig::from_section(&config.server)?;
    server_config.timeout = timeout;
    if let Some(host) = &cmd.host {
        server_config.host = host.clone();
    }
    if let Some(port) = cmd.port {
        server_config.port = port;
    }

    server::run(source, &server_config).await
}
