use bytes::Bytes;
use server_http::{build_router, AppState};
use shared::config::{ClientConfig, ServerConfig};
use shared::FailureKind;
use shared_http::api::{NewDocument, NewQuiz, NewUser, QuizStatus};
use spark_client::{keys, DocumentUpload, TutorApi};
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let config = ServerConfig::default();
    let router = build_router(AppState::new(&config), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{address}")
}

async fn api() -> TutorApi {
    let config = ClientConfig {
        retry_delay: Duration::from_millis(10),
        ..ClientConfig::with_base_url(spawn_server().await)
    };
    TutorApi::new(&config).unwrap()
}

fn grace() -> NewUser {
    NewUser {
        uid: "uid-grace".into(),
        username: "grace".into(),
        email: "grace@example.com".into(),
        photo_url: None,
    }
}

fn document(user_id: i64, name: &str) -> NewDocument {
    NewDocument {
        user_id,
        name: name.into(),
        kind: "pdf".into(),
        size: 2048,
        url: format!("/uploads/{name}"),
        tags: vec![],
    }
}

#[tokio::test]
async fn test_current_user_without_session_is_none() {
    let api = api().await;
    api.register_user(&grace()).await.unwrap();

    assert_eq!(api.current_user().await.unwrap(), None);
    // An unauthorized read leaves nothing behind.
    assert!(api.query_client().cache().entry(&keys::current_user()).is_none());
}

#[tokio::test]
async fn test_protected_read_without_session_is_unauthorized() {
    let api = api().await;

    let failure = api.documents(1).await.unwrap_err();

    assert_eq!(failure.kind, FailureKind::Unauthorized);
    assert_eq!(failure.status, Some(401));
    assert_eq!(failure.message, "Unauthorized");
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let api = api().await;
    let user = api.register_user(&grace()).await.unwrap();

    let session = api.sign_in("uid-grace").await.unwrap();
    assert_eq!(session.user, user);
    assert_eq!(api.current_user().await.unwrap(), Some(user.clone()));

    api.sign_out().await.unwrap();
    assert_eq!(api.query_client().cache().entry_count(), 0);
    assert_eq!(api.current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_write_invalidates_cached_list() {
    let api = api().await;
    let user = api.register_user(&grace()).await.unwrap();
    api.sign_in(&user.uid).await.unwrap();

    assert!(api.documents(user.id).await.unwrap().is_empty());
    let key = keys::documents(user.id);
    assert!(api.query_client().cache().entry(&key).unwrap().fresh);

    api.create_document(&document(user.id, "week1.pdf"))
        .await
        .unwrap();
    assert!(!api.query_client().cache().entry(&key).unwrap().fresh);

    let documents = api.documents(user.id).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].name, "week1.pdf");
    assert!(api.query_client().cache().entry(&key).unwrap().fresh);
}

#[tokio::test]
async fn test_upload_then_delete_document() {
    let api = api().await;
    let user = api.register_user(&grace()).await.unwrap();
    api.sign_in(&user.uid).await.unwrap();

    let uploaded = api
        .upload_document(DocumentUpload {
            user_id: user.id,
            file_name: "summary.txt".into(),
            content_type: Some("text/plain".into()),
            data: Bytes::from_static(b"borrowck"),
            tags: vec!["rust".into()],
        })
        .await
        .unwrap();
    assert_eq!(uploaded.kind, "txt");
    assert_eq!(uploaded.size, 8);
    assert_eq!(uploaded.tags, vec!["rust".to_string()]);
    assert_eq!(api.documents(user.id).await.unwrap().len(), 1);

    api.delete_document(user.id, uploaded.id).await.unwrap();
    assert!(api.documents(user.id).await.unwrap().is_empty());

    let failure = api.delete_document(user.id, uploaded.id).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::NotFound);
}

#[tokio::test]
async fn test_validation_failure_carries_server_message() {
    let api = api().await;
    let user = api.register_user(&grace()).await.unwrap();
    api.sign_in(&user.uid).await.unwrap();

    let failure = api
        .create_document(&document(user.id, "  "))
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FailureKind::Validation);
    assert_eq!(failure.status, Some(400));
    assert_eq!(failure.message, "Field 'name' must not be empty");
}

#[tokio::test]
async fn test_quiz_progress_refreshes_user_reads() {
    let api = api().await;
    let user = api.register_user(&grace()).await.unwrap();
    api.sign_in(&user.uid).await.unwrap();

    let quiz = api
        .create_quiz(&NewQuiz {
            user_id: user.id,
            title: "Traits".into(),
            description: None,
            question_count: 3,
            time_estimate: 10,
            status: QuizStatus::New,
            progress: 0,
            score: None,
        })
        .await
        .unwrap();
    assert_eq!(api.quizzes(user.id).await.unwrap()[0].status, QuizStatus::New);
    assert_eq!(api.quiz(quiz.id).await.unwrap().progress, 0);

    let updated = api
        .update_quiz_progress(quiz.id, 3.0, Some(75.0))
        .await
        .unwrap();
    assert_eq!(updated.status, QuizStatus::Completed);

    let cache = api.query_client().cache();
    assert!(!cache.entry(&keys::quizzes(user.id)).unwrap().fresh);
    assert!(!cache.entry(&keys::quiz(quiz.id)).unwrap().fresh);

    let quizzes = api.quizzes(user.id).await.unwrap();
    assert_eq!(quizzes[0].status, QuizStatus::Completed);
    assert_eq!(quizzes[0].score, Some(75));
}
