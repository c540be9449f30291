use crate::error::CatalogError;
use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};

/// Smallest number of topics a session is assigned.
pub const MIN_TOPICS_PER_SESSION: usize = 2;
/// Largest number of topics a session is assigned.
pub const MAX_TOPICS_PER_SESSION: usize = 3;

/// The fixed pool of exam topics a session samples from.
///
/// Always holds at least [`MAX_TOPICS_PER_SESSION`] distinct, non-blank
/// topics, so every draw is full-sized and free of repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct TopicCatalog {
    topics: Vec<String>,
}

impl TopicCatalog {
    /// Trims every topic and drops repeats, keeping first occurrences.
    pub fn new(topics: Vec<String>) -> Result<Self, CatalogError> {
        let mut distinct: Vec<String> = Vec::with_capacity(topics.len());
        for topic in topics {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(CatalogError::BlankTopic);
            }
            if !distinct.iter().any(|t| t == topic) {
                distinct.push(topic.to_string());
            }
        }
        if distinct.len() < MAX_TOPICS_PER_SESSION {
            return Err(CatalogError::TooFewTopics {
                required: MAX_TOPICS_PER_SESSION,
                found: distinct.len(),
            });
        }
        Ok(Self { topics: distinct })
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Draws 2 or 3 distinct topics (the count itself chosen uniformly).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let amount = rng.random_range(MIN_TOPICS_PER_SESSION..=MAX_TOPICS_PER_SESSION);
        index::sample(rng, self.topics.len(), amount)
            .into_iter()
            .map(|i| self.topics[i].clone())
            .collect()
    }
}

impl TryFrom<Vec<String>> for TopicCatalog {
    type Error = CatalogError;

    fn try_from(topics: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(topics)
    }
}

impl From<TopicCatalog> for Vec<String> {
    fn from(catalog: TopicCatalog) -> Self {
        catalog.topics
    }
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self {
            topics: [
                "Tokenization and Word Embeddings",
                "Transformer Architecture and Self-Attention",
                "BERT and Masked Language Modeling",
                "GPT Models and Autoregressive Generation",
                "Fine-tuning and Transfer Learning",
                "Named Entity Recognition (NER)",
                "Machine Translation and Seq2Seq",
                "Text Classification and Sentiment Analysis",
                "Question Answering Systems",
                "Prompt Engineering and Few-Shot Learning",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// What the sequencer reports after moving past the current topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicAdvance {
    /// Every assigned topic has been covered.
    Finished,
    Next {
        topic: String,
        /// 1-based position of the new topic.
        topic_number: usize,
        total_topics: usize,
    },
}

impl TopicAdvance {
    pub fn is_finished(&self) -> bool {
        matches!(self, TopicAdvance::Finished)
    }
}
