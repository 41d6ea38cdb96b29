// Records exchanged between the host and a data source

use serde::{Deserialize, Serialize};

/// A high-level discoverable item produced by `fetch_topics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    /// Origin label, empty means unset
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub site: String,
    /// Opaque to the host; only meaningful to the source that produced it
    #[serde(rename = "topicID")]
    pub topic_id: i64,
}

impl Topic {
    pub fn new(topic_id: i64, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source_url: source_url.into(),
            site: String::new(),
            topic_id,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    pub fn site(&self) -> Option<&str> {
        (!self.site.is_empty()).then_some(self.site.as_str())
    }
}

/// Detailed content tied to a topic, produced by `fetch_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub text: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub site: String,
    #[serde(rename = "answerID")]
    pub answer_id: i64,
}

impl Data {
    pub fn new(answer_id: i64, text: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            site: String::new(),
            answer_id,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    pub fn site(&self) -> Option<&str> {
        (!self.site.is_empty()).then_some(self.site.as_str())
    }
}

/// Retrieval intent passed to `fetch_topics`.
///
/// `asked_by` and `embedding` carry presence semantics: `None` is a different
/// value from `Some(0)` / `Some(vec![])` and absent fields are omitted from the
/// serialized form instead of being written as zero values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionInput {
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl NewQuestionInput {
    pub fn new(question_text: impl Into<String>) -> Self {
        Self {
            question_text: question_text.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn asked_by(mut self, user_id: i64) -> Self {
        self.asked_by = Some(user_id);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// True when there is a textual query to search for
    pub fn has_question(&self) -> bool {
        !self.question_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_wire_names() {
        let topic =
            Topic::new(42, "Entropy", "https://example.org/entropy").with_site("example.org");
        let value = serde_json::to_value(&topic).unwrap();
        assert_eq!(
            value,
            json!({
                "title": "Entropy",
                "sourceURL": "https://example.org/entropy",
                "site": "example.org",
                "topicID": 42
            })
        );
    }

    #[test]
    fn test_empty_site_is_unset() {
        let data = Data::new(7, "body", "https://example.org/a/7");
        assert_eq!(data.site(), None);
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("site").is_none());
        assert_eq!(value["answerID"], 7);
    }

    #[test]
    fn test_asked_by_absent_vs_zero() {
        let absent = NewQuestionInput::new("what is entropy");
        let zero = NewQuestionInput::new("what is entropy").asked_by(0);
        assert_ne!(absent, zero);

        let absent_json = serde_json::to_value(&absent).unwrap();
        let zero_json = serde_json::to_value(&zero).unwrap();
        assert!(absent_json.get("askedBy").is_none());
        assert_eq!(zero_json["askedBy"], 0);

        let absent_back: NewQuestionInput = serde_json::from_value(absent_json).unwrap();
        let zero_back: NewQuestionInput = serde_json::from_value(zero_json).unwrap();
        assert_eq!(absent_back.asked_by, None);
        assert_eq!(zero_back.asked_by, Some(0));
    }

    #[test]
    fn test_embedding_absent_vs_empty() {
        let absent = NewQuestionInput::new("q");
        let empty = NewQuestionInput::new("q").with_embedding(vec![]);

        let absent_json = serde_json::to_string(&absent).unwrap();
        let empty_json = serde_json::to_string(&empty).unwrap();
        assert!(!absent_json.contains("embedding"));
        assert!(empty_json.contains("\"embedding\":[]"));

        let empty_back: NewQuestionInput = serde_json::from_str(&empty_json).unwrap();
        assert_eq!(empty_back.embedding, Some(vec![]));
    }

    #[test]
    fn test_question_input_defaults_from_sparse_json() {
        let input: NewQuestionInput = serde_json::from_str(r#"{"questionText":"rust"}"#).unwrap();
        assert_eq!(input.question_text, "rust");
        assert!(input.tags.is_empty());
        assert!(input.asked_by.is_none());
        assert!(input.embedding.is_none());
    }

    #[test]
    fn test_has_question() {
        assert!(!NewQuestionInput::default().has_question());
        assert!(!NewQuestionInput::new("   ").has_question());
        assert!(NewQuestionInput::new("entropy").with_tags(["physics"]).has_question());
    }
}
