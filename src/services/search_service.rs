//! Keyword search over conversation titles, summaries, and messages.
//!
//! The embedding-free fallback path. Scores are plain term occurrence
//! counts, so results are fully deterministic and available even when
//! the AI provider is down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{ConversationId, MessageId};
use crate::storage::queries::{conversations, messages};
use crate::storage::{Database, DatabaseError};

/// Answer returned for a blank query.
const EMPTY_QUERY_ANSWER: &str = "Please type something to search.";

/// Answer returned when nothing scored above zero.
const NO_RESULTS_ANSWER: &str = "No relevant results found.";

/// Characters kept on each side of a matched term in a snippet.
const SNIPPET_PAD: usize = 80;

/// Hits returned per search unless overridden.
const DEFAULT_LIMIT: usize = 10;

/// Errors that can occur during keyword search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// A single keyword search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Conversation the hit came from.
    pub conversation_id: ConversationId,
    /// Message the snippet was cut from.
    pub message_id: MessageId,
    /// Content window around the first matched term.
    pub snippet: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Sum of term occurrence counts over title, summary, and content.
    pub score: u32,
}

/// Search outcome: a short status answer plus the scored hits.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Human-readable status line.
    pub answer: String,
    /// Hits in descending score order.
    pub excerpts: Vec<SearchHit>,
}

/// Term-counting search over all conversations, any status.
pub struct SearchService {
    db: Database,
    limit: usize,
}

impl SearchService {
    /// Creates a new search service with the default result limit.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Overrides how many hits are returned.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Runs a keyword search. Blank queries and empty result sets
    /// come back as canned answers with no hits, never as errors.
    ///
    /// Every message of a conversation inherits the conversation's
    /// title/summary score as a base, so a title match surfaces each
    /// of its messages. Ties keep scan order: conversations newest
    /// first, messages in transcript order.
    pub async fn search(&self, query: &str) -> SearchResult<SearchResponse> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(SearchResponse {
                answer: EMPTY_QUERY_ANSWER.to_string(),
                excerpts: Vec::new(),
            });
        }

        let terms: Vec<String> = trimmed
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut hits = Vec::new();
        for conversation in conversations::list(&self.db).await? {
            let base = score_text(
                &format!("{} {}", conversation.title, conversation.summary),
                &terms,
            );

            for message in messages::list_for_conversation(&self.db, conversation.id).await? {
                let score = base + score_text(&message.content, &terms);
                if score > 0 {
                    hits.push(SearchHit {
                        conversation_id: conversation.id,
                        message_id: message.id,
                        snippet: snippet_around(&message.content, &terms[0]),
                        timestamp: message.created_at,
                        score,
                    });
                }
            }
        }

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(self.limit);

        if hits.is_empty() {
            return Ok(SearchResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                excerpts: Vec::new(),
            });
        }

        tracing::debug!(hits = hits.len(), "Keyword search matched");

        Ok(SearchResponse {
            answer: format!("Found {} relevant excerpts.", hits.len()),
            excerpts: hits,
        })
    }
}

/// Counts non-overlapping occurrences of every term in the text.
fn score_text(text: &str, terms: &[String]) -> u32 {
    let lowered = text.to_lowercase();
    terms
        .iter()
        .map(|term| lowered.matches(term.as_str()).count() as u32)
        .sum()
}

/// Cuts a window around the first case-insensitive occurrence of the
/// term, marking clipped edges with an ellipsis. Falls back to the
/// head of the content when the term is absent.
fn snippet_around(content: &str, term: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let lowered = content.to_lowercase();
    let term_lower = term.to_lowercase();

    let Some(byte_pos) = lowered.find(&term_lower) else {
        return if chars.len() > SNIPPET_PAD * 2 {
            let mut head: String = chars[..SNIPPET_PAD * 2].iter().collect();
            head.push('…');
            head
        } else {
            content.to_string()
        };
    };

    let char_pos = lowered[..byte_pos].chars().count();
    let term_chars = term_lower.chars().count();
    let start = char_pos.saturating_sub(SNIPPET_PAD);
    let end = (char_pos + term_chars + SNIPPET_PAD).min(chars.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push('…');
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push('…');
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    async fn seed_conversation(db: &Database, title: &str, summary: &str, contents: &[&str]) {
        let conversation = conversations::insert(db, title).await.unwrap();
        for content in contents {
            messages::insert(db, conversation.id, Role::User, content)
                .await
                .unwrap();
        }
        if !summary.is_empty() {
            conversations::mark_ended(db, conversation.id, summary, &[])
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn blank_queries_short_circuit() {
        let db = Database::open_in_memory().await.unwrap();
        let svc = SearchService::new(db);

        for query in ["", "   ", "\t\n"] {
            let response = svc.search(query).await.unwrap();
            assert_eq!(response.answer, "Please type something to search.");
            assert!(response.excerpts.is_empty());
        }
    }

    #[tokio::test]
    async fn unmatched_query_returns_canned_answer() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(&db, "Paris trip", "budget travel", &["We spent $500 in Paris"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("quantum").await.unwrap();

        assert_eq!(response.answer, "No relevant results found.");
        assert!(response.excerpts.is_empty());
    }

    #[tokio::test]
    async fn title_and_content_counts_accumulate() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(&db, "Paris trip", "budget travel", &["We spent $500 in Paris"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("Paris").await.unwrap();

        assert_eq!(response.answer, "Found 1 relevant excerpts.");
        assert_eq!(response.excerpts.len(), 1);
        let hit = &response.excerpts[0];
        assert!(hit.score >= 2);
        assert!(hit.snippet.contains("Paris"));
    }

    #[tokio::test]
    async fn title_match_surfaces_every_message() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(
            &db,
            "Gardening notes",
            "",
            &["planted tomatoes", "watered everything"],
        )
        .await;

        let svc = SearchService::new(db);
        let response = svc.search("gardening").await.unwrap();

        // Neither message contains the term; the title score carries both.
        assert_eq!(response.excerpts.len(), 2);
        assert!(response.excerpts.iter().all(|hit| hit.score == 1));
        assert_eq!(response.excerpts[0].snippet, "planted tomatoes");
    }

    #[tokio::test]
    async fn hits_sort_by_score_descending() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(&db, "Logs", "", &["error once", "error error twice"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("error").await.unwrap();

        assert_eq!(response.excerpts.len(), 2);
        assert_eq!(response.excerpts[0].score, 2);
        assert_eq!(response.excerpts[1].score, 1);
        assert!(response.excerpts[0].snippet.contains("twice"));
    }

    #[tokio::test]
    async fn equal_scores_keep_scan_order() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(&db, "Chat", "", &["apple pie", "apple tart"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("apple").await.unwrap();

        assert_eq!(response.excerpts.len(), 2);
        assert!(response.excerpts[0].message_id < response.excerpts[1].message_id);
    }

    #[tokio::test]
    async fn results_truncate_to_the_limit() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(
            &db,
            "Chat",
            "",
            &["fish one", "fish two", "fish three", "fish four"],
        )
        .await;

        let svc = SearchService::new(db).with_limit(3);
        let response = svc.search("fish").await.unwrap();

        assert_eq!(response.excerpts.len(), 3);
        assert_eq!(response.answer, "Found 3 relevant excerpts.");
    }

    #[tokio::test]
    async fn matching_is_case_insensitive() {
        let db = Database::open_in_memory().await.unwrap();
        seed_conversation(&db, "Chat", "", &["RUST is great"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("rust").await.unwrap();

        assert_eq!(response.excerpts.len(), 1);
        assert!(response.excerpts[0].snippet.contains("RUST"));
    }

    #[tokio::test]
    async fn active_conversations_are_searched_too() {
        let db = Database::open_in_memory().await.unwrap();
        // No summary, so the conversation stays active.
        seed_conversation(&db, "Open chat", "", &["still talking about rust"]).await;

        let svc = SearchService::new(db);
        let response = svc.search("rust").await.unwrap();

        assert_eq!(response.excerpts.len(), 1);
    }

    #[test]
    fn snippet_clips_both_edges_of_a_long_match() {
        let content = format!("{}needle{}", "a".repeat(100), "b".repeat(100));
        let snippet = snippet_around(&content, "needle");

        assert!(snippet.starts_with('…'));
        assert!(snippet.ends_with('…'));
        assert!(snippet.contains("needle"));
        // 80 on each side plus the term itself and two ellipses.
        assert_eq!(snippet.chars().count(), 80 + 6 + 80 + 2);
    }

    #[test]
    fn snippet_keeps_unclipped_edges_clean() {
        let content = format!("needle{}", "b".repeat(40));
        let snippet = snippet_around(&content, "needle");

        assert!(!snippet.starts_with('…'));
        assert!(!snippet.ends_with('…'));
        assert_eq!(snippet, content);
    }

    #[test]
    fn snippet_without_term_takes_the_head() {
        let long = "z".repeat(200);
        let snippet = snippet_around(&long, "missing");
        assert_eq!(snippet.chars().count(), 161);
        assert!(snippet.ends_with('…'));

        let short = "brief content";
        assert_eq!(snippet_around(short, "missing"), short);
    }

    #[test]
    fn occurrences_do_not_overlap() {
        assert_eq!(score_text("aaaa", &["aa".to_string()]), 2);
        assert_eq!(score_text("Paris PARIS paris", &["paris".to_string()]), 3);
    }
}
