use crate::cli::CheckArgs;
use crate::config::Config;
use crate::formatter::Format;
use crate::sources;
use anyhow::Result;

/// Handle check command
pub async fn handle(cmd: &CheckArgs, config: &Config) -> Result<()> {
    let registry = sources::registry_from_config(config)?;

    let names: Vec<String> = match &cmd.name {
        Some(name) => {
            if registry.state(name).is_none() {
                anyhow::bail!("Data source '{}' is not configured or disabled", name);
            }
            vec![name.clone()]
        }
        None => registry.list().into_iter().map(|info| info.name).collect(),
    };

    let mut unavailable = 0;
    for name in &names {
        match registry.initialize(name).await {
            Ok(()) => {
                let available = registry.check_availability(name).await;
                if !available {
                    unavailable += 1;
                }
                println!("{:<24} {}", name, if available { "available" } else { "unavailable" });
            }
            Err(e) => {
                unavailable += 1;
                println!("{:<24} failed: {}", name, e);
            }
        }
    }

    println!();
    print!("{}", Format::from_string(&cmd.format).render_sources(&registry.list())?);
    registry.shutdown().await;

    if unavailable > 0 {
        anyhow::bail!("{} of {} sources unavailable", unavailable, names.len());
    }
    Ok(())
}
