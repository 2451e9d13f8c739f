use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

use super::book_chunk::BookChunk;

const EXCERPT_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    FullBook,
    SelectedText,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::FullBook => "full_book",
            QueryMode::SelectedText => "selected_text",
        }
    }
}

/// One cited source passage, ordered by retrieval rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceCitation {
    pub chapter: String,
    pub section: Option<String>,
    pub file: String,
    pub url: String,
    pub similarity_score: f32,
    pub excerpt: String,
}

impl SourceCitation {
    pub fn from_chunk(chunk: &BookChunk, similarity_score: f32) -> Self {
        let url = citation_url(&chunk.source_file, chunk.section.as_deref());
        let excerpt = if chunk.text.chars().count() > EXCERPT_MAX_CHARS {
            chunk.text.chars().take(EXCERPT_MAX_CHARS).collect()
        } else {
            chunk.text.clone()
        };

        Self {
            chapter: chunk.chapter.clone(),
            section: chunk.section.clone(),
            file: chunk.source_file.clone(),
            url,
            similarity_score,
            excerpt,
        }
    }
}

/// Maps "chapter-1-intro.md" + "Getting Started" to
/// "/docs/chapter-1-intro#getting-started".
fn citation_url(source_file: &str, section: Option<&str>) -> String {
    let stem = source_file.strip_suffix(".md").unwrap_or(source_file);
    let base = format!("/docs/{stem}");

    match section {
        Some(section) if !section.is_empty() => {
            let slug = section
                .to_lowercase()
                .replace(' ', "-")
                .replace('\'', "");
            format!("{base}#{slug}")
        }
        _ => base,
    }
}

stored_object!(QueryLog, "query_log", {
    session_id: Uuid,
    query_text: String,
    query_mode: QueryMode,
    selected_text: Option<String>,
    answer_text: String,
    source_chunks: Vec<SourceCitation>,
    response_time_ms: u64
});

impl QueryLog {
    pub fn new(
        session_id: Uuid,
        query_text: String,
        query_mode: QueryMode,
        selected_text: Option<String>,
        answer_text: String,
        source_chunks: Vec<SourceCitation>,
        response_time_ms: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            session_id,
            query_text,
            query_mode,
            selected_text,
            answer_text,
            source_chunks,
            response_time_ms,
        }
    }

    /// Most recent logs, newest first, optionally scoped to one session.
    pub async fn recent(
        db: &SurrealDbClient,
        session_id: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = match session_id {
            Some(session_id) => {
                db.client
                    .query(format!(
                        "SELECT * FROM {} WHERE session_id = $session_id \
                         ORDER BY created_at DESC LIMIT $limit",
                        Self::table_name()
                    ))
                    .bind(("session_id", session_id))
                    .bind(("limit", limit))
                    .await?
            }
            None => {
                db.client
                    .query(format!(
                        "SELECT * FROM {} ORDER BY created_at DESC LIMIT $limit",
                        Self::table_name()
                    ))
                    .bind(("limit", limit))
                    .await?
            }
        };

        Ok(response.take(0)?)
    }
}
