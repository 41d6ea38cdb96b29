//! Corpus-file-backed data source.
//!
//! The corpus is a YAML (or `.json`) file listing topics with their tags,
//! optional embeddings and attached answers. It is read once by `initialize`
//! and served read-only afterwards, so concurrent fetches only take a read lock.

use crate::datasource::{
    Data, DataSource, FetchError, InitializationError, InitializationErrorKind, NewQuestionInput,
    Topic,
};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

const TITLE_WEIGHT: f32 = 2.0;
const TEXT_WEIGHT: f32 = 1.0;
const TAG_WEIGHT: f32 = 1.5;
/// Words too common to say anything about a topic
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "do", "does", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "the", "to", "what", "when", "where", "which", "who", "why",
    "with",
];

/// On-disk corpus layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    /// Site label applied to records that don't set their own
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub topics: Vec<CorpusTopic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusTopic {
    pub topic_id: i64,
    pub title: String,
    pub source_url: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub data: Vec<CorpusEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub answer_id: i64,
    pub text: String,
    /// Defaults to the topic's URL
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub site: String,
}

impl Corpus {
    /// Parse a corpus file; `.json` files are read as JSON, everything else as YAML
    pub fn from_file(path: &Path) -> Result<Self, InitializationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InitializationError::new(
                InitializationErrorKind::Io,
                format!("Failed to read corpus {}: {}", path.display(), e),
            )
            .with_source(e)
        })?;

        let invalid = |e: String| {
            InitializationError::invalid_configuration(format!(
                "Failed to parse corpus {}: {}",
                path.display(),
                e
            ))
        };
        if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()).with_source(e))
        } else {
            serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()).with_source(e))
        }
    }

    /// Topic ids and answer ids must be unique; every topic needs a URL
    pub fn validate(&self) -> Result<(), InitializationError> {
        let mut topic_ids = HashSet::new();
        let mut answer_ids = HashSet::new();

        for topic in &self.topics {
            if !topic_ids.insert(topic.topic_id) {
                return Err(InitializationError::invalid_configuration(format!(
                    "duplicate topic_id {}",
                    topic.topic_id
                )));
            }
            if topic.source_url.trim().is_empty() {
                return Err(InitializationError::invalid_configuration(format!(
                    "topic {} has an empty source_url",
                    topic.topic_id
                )));
            }
            for entry in &topic.data {
                if !answer_ids.insert(entry.answer_id) {
                    return Err(InitializationError::invalid_configuration(format!(
                        "duplicate answer_id {}",
                        entry.answer_id
                    )));
                }
            }
        }
        Ok(())
    }
}

enum Origin {
    File(PathBuf),
    Inline(Corpus),
}

/// Loaded corpus plus precomputed search keys
struct Index {
    site: String,
    topics: Vec<IndexedTopic>,
    by_id: HashMap<i64, usize>,
}

struct IndexedTopic {
    topic: CorpusTopic,
    title_terms: HashSet<String>,
    text_terms: HashSet<String>,
    tags: HashSet<String>,
}

impl Index {
    fn build(corpus: Corpus) -> Self {
        let mut by_id = HashMap::with_capacity(corpus.topics.len());
        let topics = corpus
            .topics
            .into_iter()
            .enumerate()
            .map(|(i, topic)| {
                by_id.insert(topic.topic_id, i);
                let title_terms = terms(&topic.title).into_iter().collect();
                let text_terms = topic
                    .data
                    .iter()
                    .flat_map(|entry| terms(&entry.text))
                    .collect();
                let tags = topic.tags.iter().map(|t| t.to_lowercase()).collect();
                IndexedTopic {
                    topic,
                    title_terms,
                    text_terms,
                    tags,
                }
            })
            .collect();

        Self {
            site: corpus.site,
            topics,
            by_id,
        }
    }

    fn site_for<'a>(&'a self, own: &'a str) -> &'a str {
        if own.is_empty() {
            &self.site
        } else {
            own
        }
    }
}

/// Lower-cased alphanumeric terms, deduplicated, stop words dropped
fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

fn score(
    entry: &IndexedTopic,
    query_terms: &BTreeSet<String>,
    query_tags: &HashSet<String>,
    embedding: Option<&[f32]>,
) -> f32 {
    let mut score = 0.0;

    for term in query_terms {
        if entry.title_terms.contains(term) {
            score += TITLE_WEIGHT;
        } else if entry.text_terms.contains(term) {
            score += TEXT_WEIGHT;
        }
    }

    score += TAG_WEIGHT * entry.tags.intersection(query_tags).count() as f32;

    if let (Some(query), Some(own)) = (embedding, entry.topic.embedding.as_deref()) {
        if let Some(similarity) = cosine(query, own) {
            score += similarity.max(0.0);
        }
    }

    score
}

/// Reference data source serving a local corpus
pub struct StaticSource {
    name: String,
    origin: Origin,
    require_text: bool,
    index: RwLock<Option<Arc<Index>>>,
}

impl StaticSource {
    /// Source reading its corpus from `path` on `initialize`
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::File(path.into()),
            require_text: true,
            index: RwLock::new(None),
        }
    }

    /// Source serving an in-memory corpus
    pub fn from_corpus(name: impl Into<String>, corpus: Corpus) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Inline(corpus),
            require_text: true,
            index: RwLock::new(None),
        }
    }

    /// Whether an empty `question_text` is rejected as invalid input
    pub fn require_text(mut self, require: bool) -> Self {
        self.require_text = require;
        self
    }

    async fn loaded(&self) -> Result<Arc<Index>, FetchError> {
        self.index
            .read()
            .await
            .clone()
            .ok_or_else(|| FetchError::not_initialized(&self.name))
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        let mut slot = self.index.write().await;
        if slot.is_some() {
            return Ok(());
        }

        let corpus = match &self.origin {
            Origin::File(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || Corpus::from_file(&path))
                    .await
                    .map_err(|e| {
                        InitializationError::new(
                            InitializationErrorKind::Io,
                            "corpus loader task failed",
                        )
                        .with_source(e)
                    })??
            }
            Origin::Inline(corpus) => corpus.clone(),
        };
        corpus.validate()?;

        info!("Source '{}' loaded {} topics", self.name, corpus.topics.len());
        *slot = Some(Arc::new(Index::build(corpus)));
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        self.index.read().await.is_some()
    }

    async fn fetch_topics(
        &self,
        count: usize,
        input: &NewQuestionInput,
    ) -> Result<Vec<Topic>, FetchError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let index = self.loaded().await?;

        if self.require_text && !input.has_question() {
            return Err(FetchError::invalid_input(format!(
                "source '{}' requires question text",
                self.name
            )));
        }

        let query_terms = terms(&input.question_text);
        let query_tags: HashSet<String> = input.tags.iter().map(|t| t.to_lowercase()).collect();
        let embedding = input.embedding.as_deref();

        let mut ranked: Vec<(f32, &IndexedTopic)> = index
            .topics
            .iter()
            .map(|entry| (score(entry, &query_terms, &query_tags, embedding), entry))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        ranked.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| a.topic.topic_id.cmp(&b.topic.topic_id))
        });

        debug!(
            "Source '{}' matched {} topics for {:?}",
            self.name,
            ranked.len(),
            input.question_text
        );

        Ok(ranked
            .into_iter()
            .take(count)
            .map(|(_, entry)| {
                let topic = &entry.topic;
                Topic::new(topic.topic_id, topic.title.clone(), topic.source_url.clone())
                    .with_site(index.site_for(&topic.site))
            })
            .collect())
    }

    async fn fetch_data(&self, count: usize, topic_id: i64) -> Result<Vec<Data>, FetchError> {
        if count == 0 {
            return Ok(vec![]);
        }
        let index = self.loaded().await?;

        let Some(&position) = index.by_id.get(&topic_id) else {
            debug!("Source '{}' has no topic {}", self.name, topic_id);
            return Ok(vec![]);
        };
        let topic = &index.topics[position].topic;

        Ok(topic
            .data
            .iter()
            .filter(|entry| !entry.text.trim().is_empty())
            .take(count)
            .map(|entry| {
                let url = entry.source_url.as_deref().unwrap_or(&topic.source_url);
                let site = if entry.site.is_empty() {
                    index.site_for(&topic.site)
                } else {
                    entry.site.as_str()
                };
                Data::new(entry.answer_id, entry.text.clone(), url).with_site(site)
            })
            .collect())
    }

    async fn shutdown(&self) {
        self.index.write().await.take();
        debug!("Source '{}' released its corpus", self.name);
    }
}
