use crate::cli::TopicsArgs;
use crate::config::Config;
use crate::datasource::NewQuestionInput;
use crate::formatter::Format;
use crate::sources;
use anyhow::{Context, Result};

/// Handle topics command
pub async fn handle(cmd: &TopicsArgs, config: &Config) -> Result<()> {
    let registry = sources::registry_from_config(config)?;
    let format = Format::from_string(&cmd.format);

    let mut input = NewQuestionInput::new(cmd.question.clone()).with_tags(cmd.tags.iter().cloned());
    if let Some(user) = cmd.asked_by {
        input = input.asked_by(user);
    }

    let rendered = if cmd.source == "all" {
        for (name, result) in registry.initialize_all().await {
            if let Err(e) = result {
                log::warn!("Skipping '{}': {}", name, e);
            }
        }
        let results = registry.fetch_topics_all(cmd.count, &input).await;
        format.render_fanout(&results)
    } else {
        registry.initialize(&cmd.source).await?;
        let topics = registry
            .fetch_topics(&cmd.source, cmd.count, &input)
            .await
            .with_context(|| format!("Failed to fetch topics from '{}'", cmd.source))?;
        format.render_topics(&cmd.source, &topics)
    };

    registry.shutdown().await;
    print!("{}", rendered?);
    Ok(())
}
