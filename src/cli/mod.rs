use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Topicsource - query pluggable topic and answer sources
#[derive(Parser, Debug)]
#[command(name = "topicsource")]
#[command(author = "Topicsource Team")]
#[command(version = "0.1.0")]
#[command(about = "Query pluggable topic and answer data sources", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $TOPICSOURCE_CONFIG or ~/.config/topicsource/sources.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

// CLI submodule declarations
pub mod check;
pub mod data;
pub mod list;
pub mod serve;
pub mod topics;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List configured data sources
    List(ListArgs),

    /// Initialize sources and probe their availability
    Check(CheckArgs),

    /// Fetch topics for a question
    Topics(TopicsArgs),

    /// Fetch data for a topic
    Data(DataArgs),

    /// Serve a configured source over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format: cli, json
    #[arg(long, default_value = "cli")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only check this source
    pub name: Option<String>,
    /// Output format for the state table: cli, json
    #[arg(long, default_value = "cli")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct TopicsArgs {
    /// Source name, or "all" to query every enabled source
    pub source: String,
    /// Question text
    pub question: String,
    /// Tag narrowing the search (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Id of the asking user
    #[arg(long)]
    pub asked_by: Option<i64>,
    /// Maximum number of topics
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,
    /// Output format: cli, json, md, csv
    #[arg(long, default_value = "cli")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Source name
    pub source: String,
    /// Topic id returned by `topics`
    #[arg(allow_hyphen_values = true)]
    pub topic_id: i64,
    /// Maximum number of records
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,
    /// Output format: cli, json, md, csv
    #[arg(long, default_value = "cli")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Source name to expose
    pub source: String,
    /// Listen host (overrides config)
    #[arg(long)]
    pub host: Option<String>,
    /// Listen port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}
