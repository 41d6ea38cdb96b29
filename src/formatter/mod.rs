use crate::datasource::{Data, Topic};
use crate::registry::{SourceInfo, SourceTopics};
use serde::Serialize;
use std::fmt::Write as _;

/// Output format types
#[derive(Debug, Clone)]
pub enum Format {
    Cli,
    Json,
    Markdown,
    Csv,
}

impl Format {
    /// Create format from string
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "md" | "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            _ => Self::Cli,
        }
    }

    /// Render topics returned by one source
    pub fn render_topics(&self, source: &str, topics: &[Topic]) -> Result<String, anyhow::Error> {
        let mut out = String::new();
        match self {
            Self::Cli => {
                writeln!(out, "{}: {} topics", source, topics.len())?;
                writeln!(out, "{:<20} {:<40} URL", "TopicID", "Title")?;
                writeln!(out, "{}", "-".repeat(100))?;
                for topic in topics {
                    writeln!(
                        out,
                        "{:<20} {:<40} {}",
                        topic.topic_id,
                        truncate(&topic.title, 40),
                        topic.source_url
                    )?;
                }
            }
            Self::Json => {
                #[derive(Serialize)]
                struct JsonTopics<'a> {
                    source: &'a str,
                    total: usize,
                    topics: &'a [Topic],
                }
                let output = JsonTopics { source, total: topics.len(), topics };
                writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
            }
            Self::Markdown => {
                writeln!(out, "# Topics from {}", source)?;
                writeln!(out)?;
                for (i, topic) in topics.iter().enumerate() {
                    writeln!(
                        out,
                        "{}. [{}]({}) (id {})",
                        i + 1,
                        topic.title,
                        topic.source_url,
                        topic.topic_id
                    )?;
                }
            }
            Self::Csv => {
                writeln!(out, "topic_id,title,source_url,site")?;
                for topic in topics {
                    writeln!(
                        out,
                        "{},{},{},{}",
                        topic.topic_id,
                        escape_csv(&topic.title),
                        escape_csv(&topic.source_url),
                        escape_csv(&topic.site)
                    )?;
                }
            }
        }
        Ok(out)
    }

    /// Render the results of a fan-out across sources
    pub fn render_fanout(&self, results: &[SourceTopics]) -> Result<String, anyhow::Error> {
        if let Self::Json = self {
            #[derive(Serialize)]
            struct JsonEntry<'a> {
                source: &'a str,
                #[serde(skip_serializing_if = "Option::is_none")]
                topics: Option<&'a [Topic]>,
                #[serde(skip_serializing_if = "Option::is_none")]
                error: Option<String>,
            }
            let entries: Vec<JsonEntry> = results
                .iter()
                .map(|r| match &r.result {
                    Ok(topics) => JsonEntry {
                        source: &r.source,
                        topics: Some(topics.as_slice()),
                        error: None,
                    },
                    Err(e) => JsonEntry {
                        source: &r.source,
                        topics: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            return Ok(format!("{}\n", serde_json::to_string_pretty(&entries)?));
        }

        let mut out = String::new();
        for entry in results {
            match &entry.result {
                Ok(topics) => out.push_str(&self.render_topics(&entry.source, topics)?),
                Err(e) => writeln!(out, "{}: error: {}", entry.source, e)?,
            }
            writeln!(out)?;
        }
        Ok(out)
    }

    /// Render data records for a topic
    pub fn render_data(
        &self,
        source: &str,
        topic_id: i64,
        data: &[Data],
    ) -> Result<String, anyhow::Error> {
        let mut out = String::new();
        match self {
            Self::Cli => {
                writeln!(out, "{}: {} records for topic {}", source, data.len(), topic_id)?;
                for record in data {
                    writeln!(out, "{}", "-".repeat(100))?;
                    writeln!(out, "[{}] {}", record.answer_id, record.source_url)?;
                    writeln!(out, "{}", record.text)?;
                }
            }
            Self::Json => {
                #[derive(Serialize)]
                struct JsonData<'a> {
                    source: &'a str,
                    #[serde(rename = "topicID")]
                    topic_id: i64,
                    total: usize,
                    data: &'a [Data],
                }
                let output = JsonData { source, topic_id, total: data.len(), data };
                writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
            }
            Self::Markdown => {
                writeln!(out, "# Topic {} from {}", topic_id, source)?;
                for record in data {
                    writeln!(out)?;
                    writeln!(out, "## Answer {}", record.answer_id)?;
                    writeln!(out, "<{}>", record.source_url)?;
                    writeln!(out)?;
                    writeln!(out, "{}", record.text)?;
                }
            }
            Self::Csv => {
                writeln!(out, "answer_id,source_url,site,text")?;
                for record in data {
                    writeln!(
                        out,
                        "{},{},{},{}",
                        record.answer_id,
                        escape_csv(&record.source_url),
                        escape_csv(&record.site),
                        escape_csv(&record.text)
                    )?;
                }
            }
        }
        Ok(out)
    }

    /// Render the registry listing
    pub fn render_sources(&self, sources: &[SourceInfo]) -> Result<String, anyhow::Error> {
        let mut out = String::new();
        match self {
            Self::Json => writeln!(out, "{}", serde_json::to_string_pretty(sources)?)?,
            _ => {
                writeln!(out, "{:<24} {:<12} Timeout", "Source", "State")?;
                for info in sources {
                    writeln!(
                        out,
                        "{:<24} {:<12} {}ms",
                        info.name,
                        info.state.to_string(),
                        info.timeout_ms
                    )?;
                }
            }
        }
        Ok(out)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut cut: String = s.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

/// Quote a CSV field when needed
fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("line\r\nbreak"), "\"line\r\nbreak\"");
        assert_eq!(escape_csv("bare\rreturn"), "\"bare\rreturn\"");
    }
}
