use crate::error::ClientError;
use crate::keys;
use crate::transport::HttpTransport;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::config::ClientConfig;
use shared::{Failure, FetchResult};
use shared_http::api::{
    ChatConversation, ChatMessage, DeckProgressUpdate, Document, Flashcard, FlashcardDeck,
    MasteryUpdate, NewChatConversation, NewChatMessage, NewDocument, NewFlashcard,
    NewFlashcardDeck, NewQuiz, NewQuizQuestion, NewStudySession, NewUser, Quiz, QuizProgressUpdate,
    QuizQuestion, RecordId, SessionResponse, SignInRequest, StudySession, User,
};
use spark::{
    FormPart, MutationOptions, QueryClient, QueryClientConfig, QueryOptions, RequestBody,
    ResourceKey, ResourceRequest, Transport,
};
use std::sync::Arc;
use storage_engine::MokaEntryStore;
use tracing::info;

/// A file sent to `POST /api/documents/upload` as a multipart form.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentUpload {
    pub user_id: RecordId,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    pub tags: Vec<String>,
}

impl DocumentUpload {
    fn into_parts(self) -> Vec<FormPart> {
        let mut parts = vec![FormPart::text("userId", self.user_id.to_string())];
        if !self.tags.is_empty() {
            parts.push(FormPart::text("tags", self.tags.join(",")));
        }
        parts.push(FormPart::file(
            "file",
            self.file_name,
            self.content_type,
            self.data,
        ));
        parts
    }
}

/// Typed call sites of the tutoring API: reads go through the query cache,
/// writes run once and invalidate what they change.
#[derive(Clone, Debug)]
pub struct TutorApi {
    client: QueryClient,
}

impl TutorApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config)?;
        info!("Tutor API client for {}", transport.base_url());
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        let store = Arc::new(MokaEntryStore::new("spark-query-cache", None));
        Self {
            client: QueryClient::new(transport, store, QueryClientConfig::from(config)),
        }
    }

    pub fn query_client(&self) -> &QueryClient {
        &self.client
    }

    async fn read<T: DeserializeOwned>(&self, key: ResourceKey) -> FetchResult<T> {
        self.client
            .query(&key, QueryOptions::new())
            .await?
            .ok_or_else(|| Failure::unknown(format!("read of {key} resolved without a value")))
    }

    async fn write<T, B>(
        &self,
        request: ResourceRequest,
        body: &B,
        invalidates: Vec<ResourceKey>,
    ) -> FetchResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = request.with_json(body)?;
        self.client
            .mutate(&request, &MutationOptions::invalidating(invalidates))
            .await
    }

    // Auth

    /// Opens a session for a registered uid; the server sets the cookie.
    pub async fn sign_in(&self, uid: &str) -> FetchResult<SessionResponse> {
        let body = SignInRequest {
            uid: uid.to_string(),
        };
        self.write(
            ResourceRequest::post("/api/auth/session"),
            &body,
            vec![keys::auth()],
        )
        .await
    }

    /// Ends the session and drops every cached read, whatever the server says.
    pub async fn sign_out(&self) -> FetchResult<()> {
        let result = self
            .client
            .mutate::<()>(
                &ResourceRequest::delete("/api/auth/session"),
                &MutationOptions::new(),
            )
            .await;
        self.client.clear();
        result
    }

    /// The signed-in user, or `None` without a session.
    pub async fn current_user(&self) -> FetchResult<Option<User>> {
        self.client
            .query(
                &keys::current_user(),
                QueryOptions::new().return_none_on_unauthorized(),
            )
            .await
    }

    // Users

    pub async fn register_user(&self, user: &NewUser) -> FetchResult<User> {
        self.write(
            ResourceRequest::post(keys::USERS),
            user,
            vec![keys::user(&user.uid)],
        )
        .await
    }

    pub async fn user(&self, uid: &str) -> FetchResult<User> {
        self.read(keys::user(uid)).await
    }

    // Study sessions

    pub async fn study_sessions(&self, user_id: RecordId) -> FetchResult<Vec<StudySession>> {
        self.read(keys::study_sessions(user_id)).await
    }

    pub async fn create_study_session(&self, session: &NewStudySession) -> FetchResult<StudySession> {
        self.write(
            ResourceRequest::post("/api/study-sessions"),
            session,
            vec![keys::study_sessions(session.user_id)],
        )
        .await
    }

    // Documents

    pub async fn documents(&self, user_id: RecordId) -> FetchResult<Vec<Document>> {
        self.read(keys::documents(user_id)).await
    }

    pub async fn create_document(&self, document: &NewDocument) -> FetchResult<Document> {
        self.write(
            ResourceRequest::post("/api/documents"),
            document,
            vec![keys::documents(document.user_id)],
        )
        .await
    }

    pub async fn upload_document(&self, upload: DocumentUpload) -> FetchResult<Document> {
        let invalidates = MutationOptions::new().invalidate(keys::documents(upload.user_id));
        let request = ResourceRequest::post("/api/documents/upload")
            .with_body(RequestBody::Multipart(upload.into_parts()));
        self.client.mutate(&request, &invalidates).await
    }

    pub async fn delete_document(&self, user_id: RecordId, document_id: RecordId) -> FetchResult<()> {
        self.client
            .mutate(
                &ResourceRequest::delete(format!("/api/documents/{document_id}")),
                &MutationOptions::new().invalidate(keys::documents(user_id)),
            )
            .await
    }

    // Flashcards

    pub async fn flashcard_decks(&self, user_id: RecordId) -> FetchResult<Vec<FlashcardDeck>> {
        self.read(keys::flashcard_decks(user_id)).await
    }

    pub async fn flashcard_deck(&self, deck_id: RecordId) -> FetchResult<FlashcardDeck> {
        self.read(keys::flashcard_deck(deck_id)).await
    }

    pub async fn create_flashcard_deck(&self, deck: &NewFlashcardDeck) -> FetchResult<FlashcardDeck> {
        self.write(
            ResourceRequest::post(keys::FLASHCARD_DECKS),
            deck,
            vec![keys::flashcard_decks(deck.user_id)],
        )
        .await
    }

    pub async fn update_deck_progress(
        &self,
        user_id: RecordId,
        deck_id: RecordId,
        progress: f64,
    ) -> FetchResult<FlashcardDeck> {
        self.write(
            ResourceRequest::patch(format!("{}/progress", keys::flashcard_deck(deck_id).to_path())),
            &DeckProgressUpdate { progress },
            vec![
                keys::flashcard_deck(deck_id),
                keys::flashcard_decks(user_id),
            ],
        )
        .await
    }

    pub async fn flashcards(&self, deck_id: RecordId) -> FetchResult<Vec<Flashcard>> {
        self.read(keys::flashcards(deck_id)).await
    }

    pub async fn create_flashcard(&self, card: &NewFlashcard) -> FetchResult<Flashcard> {
        self.write(
            ResourceRequest::post("/api/flashcards"),
            card,
            vec![keys::flashcards(card.deck_id)],
        )
        .await
    }

    pub async fn set_flashcard_mastery(
        &self,
        deck_id: RecordId,
        card_id: RecordId,
        mastered: bool,
    ) -> FetchResult<Flashcard> {
        self.write(
            ResourceRequest::patch(format!("/api/flashcards/{card_id}/mastery")),
            &MasteryUpdate { mastered },
            vec![keys::flashcards(deck_id)],
        )
        .await
    }

    // Quizzes

    pub async fn quizzes(&self, user_id: RecordId) -> FetchResult<Vec<Quiz>> {
        self.read(keys::quizzes(user_id)).await
    }

    pub async fn quiz(&self, quiz_id: RecordId) -> FetchResult<Quiz> {
        self.read(keys::quiz(quiz_id)).await
    }

    pub async fn create_quiz(&self, quiz: &NewQuiz) -> FetchResult<Quiz> {
        self.write(
            ResourceRequest::post(keys::QUIZZES),
            quiz,
            vec![keys::quizzes(quiz.user_id)],
        )
        .await
    }

    /// Progress feeds every user dashboard, so all user-scoped reads go stale.
    pub async fn update_quiz_progress(
        &self,
        quiz_id: RecordId,
        progress: f64,
        score: Option<f64>,
    ) -> FetchResult<Quiz> {
        self.write(
            ResourceRequest::patch(format!("{}/progress", keys::quiz(quiz_id).to_path())),
            &QuizProgressUpdate { progress, score },
            vec![keys::users(), keys::quiz(quiz_id)],
        )
        .await
    }

    pub async fn quiz_questions(&self, quiz_id: RecordId) -> FetchResult<Vec<QuizQuestion>> {
        self.read(keys::quiz_questions(quiz_id)).await
    }

    pub async fn create_quiz_question(&self, question: &NewQuizQuestion) -> FetchResult<QuizQuestion> {
        self.write(
            ResourceRequest::post("/api/quiz-questions"),
            question,
            vec![keys::quiz_questions(question.quiz_id)],
        )
        .await
    }

    // Chat

    pub async fn chat_conversations(&self, user_id: RecordId) -> FetchResult<Vec<ChatConversation>> {
        self.read(keys::chat_conversations(user_id)).await
    }

    pub async fn create_chat_conversation(
        &self,
        conversation: &NewChatConversation,
    ) -> FetchResult<ChatConversation> {
        self.write(
            ResourceRequest::post(keys::CHAT_CONVERSATIONS),
            conversation,
            vec![keys::chat_conversations(conversation.user_id)],
        )
        .await
    }

    pub async fn chat_messages(&self, conversation_id: RecordId) -> FetchResult<Vec<ChatMessage>> {
        self.read(keys::chat_messages(conversation_id)).await
    }

    pub async fn create_chat_message(&self, message: &NewChatMessage) -> FetchResult<ChatMessage> {
        self.write(
            ResourceRequest::post("/api/chat-messages"),
            message,
            vec![keys::chat_messages(message.conversation_id)],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_form_layout() {
        let upload = DocumentUpload {
            user_id: 4,
            file_name: "notes.pdf".into(),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(b"%PDF"),
            tags: vec!["rust".into(), "async".into()],
        };

        let parts = upload.into_parts();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], FormPart::text("userId", "4"));
        assert_eq!(parts[1], FormPart::text("tags", "rust,async"));
        assert_eq!(parts[2].name, "file");
        assert_eq!(parts[2].file_name.as_deref(), Some("notes.pdf"));
        assert_eq!(parts[2].data, Bytes::from_static(b"%PDF"));
    }
}
