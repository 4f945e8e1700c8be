use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record identifiers are assigned by the server, starting at 1.
pub type RecordId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub uid: String,
    pub username: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: RecordId,
    pub user_id: RecordId,
    pub topic: String,
    pub date: DateTime<Utc>,
    /// Minutes.
    pub duration: u32,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: RecordId,
    pub user_id: RecordId,
    pub name: String,
    /// pdf, docx, txt
    #[serde(rename = "type")]
    pub kind: String,
    /// Bytes.
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardDeck {
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub card_count: u32,
    /// Percentage complete.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: RecordId,
    pub deck_id: RecordId,
    pub question: String,
    pub answer: String,
    pub mastered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    #[default]
    New,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub question_count: u32,
    /// Minutes.
    pub time_estimate: u32,
    pub status: QuizStatus,
    /// Number of completed questions.
    pub progress: u32,
    /// Percentage, once completed.
    pub score: Option<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: RecordId,
    pub quiz_id: RecordId,
    pub question_text: String,
    pub code: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConversation {
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: RecordId,
    pub conversation_id: RecordId,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
}

// Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned when a session is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_uses_wire_names() {
        let json = serde_json::json!({
            "id": 3,
            "userId": 42,
            "name": "notes.pdf",
            "type": "pdf",
            "size": 2048,
            "url": "/uploads/notes.pdf",
            "uploadedAt": "2024-05-01T10:00:00Z"
        });
        let document: Document = serde_json::from_value(json).unwrap();
        assert_eq!(document.user_id, 42);
        assert_eq!(document.kind, "pdf");
        assert!(document.tags.is_empty());
    }

    #[test]
    fn test_quiz_status_wire_format() {
        assert_eq!(
            serde_json::to_value(QuizStatus::InProgress).unwrap(),
            serde_json::json!("in_progress")
        );
    }
}
