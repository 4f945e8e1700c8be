use super::responses::{ChatRole, QuizStatus, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub uid: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Opens a session for an already registered identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInRequest {
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySession {
    pub user_id: RecordId,
    pub topic: String,
    pub duration: u32,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub user_id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcardDeck {
    pub user_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub card_count: u32,
    #[serde(default)]
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFlashcard {
    pub deck_id: RecordId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub mastered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuiz {
    pub user_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub question_count: u32,
    pub time_estimate: u32,
    #[serde(default)]
    pub status: QuizStatus,
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuizQuestion {
    pub quiz_id: RecordId,
    pub question_text: String,
    #[serde(default)]
    pub code: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatConversation {
    pub user_id: RecordId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub conversation_id: RecordId,
    pub role: ChatRole,
    pub content: String,
}

/// Raw numbers are accepted so out-of-range values reach the range check
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckProgressUpdate {
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryUpdate {
    pub mastered: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizProgressUpdate {
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}
