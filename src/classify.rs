//! Keyword classification through a text-generation service.
//!
//! Each batch of keywords becomes one prompt. The response is free text that
//! should contain one JSON object mapping every keyword to a category label.
//! Transport errors and unparseable responses are retried with a fixed pause;
//! a batch that never yields a usable object maps every keyword to
//! [`Category::Other`].

use std::{
    collections::{BTreeMap, HashSet},
    time::Duration,
};

use serde_json::{Map, Value};

use crate::{
    category::Category,
    completion::CompletionClient,
    error::Error,
    extract::{ExtractError, extract_json_object},
    retry::{FixedBackoff, with_fixed_backoff},
    sink::RankedKeywordRecord,
};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_KEYWORD_LIMIT: usize = 30;

/// Characters of each raw response written to the debug log.
const RESPONSE_PREVIEW_CHARS: usize = 500;

const INSTRUCTIONS: &str = "\
You are an expert at classifying movies, TV programmes and other \
entertainment content from the search terms viewers type into a Vietnamese \
streaming service.

Rules:
- Do not answer \"Other\" if the meaning can be guessed even partially.
- Fix typos, restore missing Vietnamese diacritics and split run-together \
words before deciding (e.g. \"thuyếtminh\" -> \"Thuyết minh\", \"tramnamu\" -> \
\"Trăm năm hữu duyên\", \"capdoi\" -> \"Cặp đôi\").
- A term may be a film, show, series, team, country, character or a \
description of a genre. When unsure, pick the closest category.

Hints:
- Contains \"VTV\", \"HTV\" or \"Channel\" -> TV Channel
- Contains \"running\", \"master key\", \"reality\", \"idol\", \"show\" or \
\"challenge\" -> Reality Show
- Countries, football clubs, sporting events -> Sports or News
- Contains \"romantic\", \"love\" or \"kiss\" -> Romance
- Contains \"potter\", \"hogwarts\", \"wizard\" or \"magic\" -> Drama
- Chinese films, actors or series -> C Drama
- Korean films, actors or series -> K Drama
- Cartoons and anime characters -> Animation
- Fighting words (\"fight\", \"gun\", \"hero\", \"war\") -> Action
- News phrases (\"breaking\", \"live\", \"news\") -> News
- Generic phrases (\"video\", \"clip\", \"xem phim\") -> Other

Answer with exactly one JSON object and nothing else.
- Key: the search term exactly as given in the list.
- Value: one of the allowed categories.

Example:
{
  \"thuyếtminh\": \"Other\",
  \"bigfoot\": \"Horror\",
  \"capdoi\": \"Romance\",
  \"ARGEN\": \"Sports\",
  \"nhật ký\": \"Drama\",
  \"PENT\": \"C Drama\",
  \"running\": \"Reality Show\",
  \"VTV3\": \"TV Channel\"
}
";

/// Build the prompt for one batch of keywords.
pub fn build_prompt(keywords: &[String]) -> String {
    let allowed = Category::ALL
        .iter()
        .map(|c| format!("- {}", c.label()))
        .collect::<Vec<_>>()
        .join("\n");
    let list = Value::from(keywords.to_vec()).to_string();

    format!("{INSTRUCTIONS}\nAllowed categories:\n{allowed}\n\nList:\n{list}\n")
}

/// Map every keyword of a batch to the category found in `parsed`.
///
/// Keywords missing from the response, or whose value is not a string, become
/// [`Category::Other`]. Keys that are not in the batch are ignored.
pub fn assign_categories(
    keywords: &[String],
    parsed: &Map<String, Value>,
) -> BTreeMap<String, Category> {
    keywords
        .iter()
        .map(|keyword| {
            let category = parsed
                .get(keyword)
                .and_then(Value::as_str)
                .map(Category::resolve)
                .unwrap_or(Category::Other);
            (keyword.clone(), category)
        })
        .collect()
}

/// Keywords to classify from a ranked CSV: the first `limit` rows with a
/// non-blank keyword, deduplicated in order of first appearance.
pub fn top_keywords(rows: &[RankedKeywordRecord], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.keyword.as_deref())
        .filter(|keyword| !keyword.trim().is_empty())
        .take(limit)
        .filter(|keyword| seen.insert(*keyword))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierSettings {
    pub batch_size: usize,
    /// Attempts per batch, including the first one.
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum BatchFailure {
    #[error("transport failure: {0}")]
    Transport(Error),

    #[error("parse failure: {0}")]
    Parse(ExtractError),
}

pub struct Classifier<C> {
    client: C,
    settings: ClassifierSettings,
}

impl<C: CompletionClient> Classifier<C> {
    pub fn new(client: C, settings: ClassifierSettings) -> Self {
        Self { client, settings }
    }

    /// Classify one batch. Never fails: exhausted retries map the whole batch
    /// to [`Category::Other`].
    pub async fn classify(
        &self,
        keywords: &[String],
    ) -> BTreeMap<String, Category> {
        if keywords.is_empty() {
            return BTreeMap::new();
        }

        let prompt = build_prompt(keywords);
        let policy = FixedBackoff {
            attempts: self.settings.max_retries,
            delay: self.settings.retry_delay,
        };

        let outcome = with_fixed_backoff(policy, |attempt| {
            self.attempt(&prompt, keywords, attempt)
        })
        .await;

        match outcome {
            Ok(mapping) => mapping,
            Err(exhausted) => {
                tracing::warn!(
                    keywords = keywords.len(),
                    error = %exhausted,
                    "classification failed, defaulting batch to Other"
                );
                keywords
                    .iter()
                    .map(|k| (k.clone(), Category::Other))
                    .collect()
            }
        }
    }

    /// Classify any number of keywords, one batch at a time.
    pub async fn classify_all(
        &self,
        keywords: &[String],
    ) -> BTreeMap<String, Category> {
        let batch_size = self.settings.batch_size.max(1);
        let batches = keywords.len().div_ceil(batch_size);
        let mut merged = BTreeMap::new();

        for (index, batch) in keywords.chunks(batch_size).enumerate() {
            tracing::info!(
                batch = index + 1,
                batches,
                keywords = batch.len(),
                "classifying batch"
            );
            merged.extend(self.classify(batch).await);
        }

        merged
    }

    async fn attempt(
        &self,
        prompt: &str,
        keywords: &[String],
        attempt: u32,
    ) -> Result<BTreeMap<String, Category>, BatchFailure> {
        let text = self
            .client
            .complete(prompt)
            .await
            .map_err(BatchFailure::Transport)?;

        tracing::debug!(
            attempt,
            response = %preview(&text),
            "classifier response"
        );

        let parsed = extract_json_object(&text).map_err(BatchFailure::Parse)?;
        Ok(assign_categories(keywords, &parsed))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(RESPONSE_PREVIEW_CHARS).collect()
}
