use crate::cli::ListArgs;
use crate::config::Config;
use crate::formatter::Format;
use anyhow::Result;

/// Handle list command
pub fn handle(cmd: &ListArgs, config: &Config) -> Result<()> {
    if config.sources.is_empty() {
        println!("No data sources configured.");
        return Ok(());
    }

    if let Format::Json = Format::from_string(&cmd.format) {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            name: &'a str,
            kind: &'a str,
            enabled: bool,
            timeout_ms: u128,
        }
        let rows: Vec<Row> = config
            .sources
            .iter()
            .map(|s| Row {
                name: &s.name,
                kind: s.kind.label(),
                enabled: s.enabled,
                timeout_ms: config.timeout_for(s).as_millis(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<24} {:<8} {:<8} Timeout", "Source", "Kind", "Enabled");
    for source in &config.sources {
        println!(
            "{:<24} {:<8} {:<8} {}ms",
            source.name,
            source.kind.label(),
            if source.enabled { "yes" } else { "no" },
            config.timeout_for(source).as_millis()
        );
    }
    Ok(())
}
