//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `pollboard_test`)
//!   `TEST_DB_PASSWORD` (default: `pollboard_test`)
//!   `TEST_DB_NAME` (default: `pollboard_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use pollboard_common::AppError;
use pollboard_db::entities::{editor_grant, form, question, question_option, response, user};
use pollboard_db::repositories::{
    EditorGrantRepository, FormRepository, QuestionOptionRepository, QuestionRepository,
    ResponseRepository, UserRepository,
};
use pollboard_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::Set;

fn user_model(id: &str, username: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(username.to_string()),
        username_lower: Set(username.to_lowercase()),
        display_name: Set(None),
        token: Set(Some(format!("token-{id}"))),
        is_admin: Set(false),
        created_at: Set(Utc::now().into()),
    }
}

fn form_model(id: &str, creator_id: &str) -> form::ActiveModel {
    form::ActiveModel {
        id: Set(id.to_string()),
        title: Set("Class awards".to_string()),
        description: Set(None),
        is_published: Set(true),
        results_revealed: Set(false),
        results_revealed_at: Set(None),
        creator_id: Set(creator_id.to_string()),
        invite_token: Set(Some("tok1".to_string())),
        invite_enabled: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_ballot_uniqueness_enforced() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::clone(&db.conn);

    let users = UserRepository::new(Arc::clone(&conn));
    let forms = FormRepository::new(Arc::clone(&conn));
    let questions = QuestionRepository::new(Arc::clone(&conn));
    let options = QuestionOptionRepository::new(Arc::clone(&conn));
    let responses = ResponseRepository::new(Arc::clone(&conn));

    users.create(user_model("u1", "alice")).await.unwrap();
    users.create(user_model("u2", "bob")).await.unwrap();
    forms.create(form_model("f1", "u1")).await.unwrap();

    questions
        .create(question::ActiveModel {
            id: Set("q1".to_string()),
            form_id: Set("f1".to_string()),
            title: Set("Best mascot".to_string()),
            question_order: Set(0),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();
    options
        .create(question_option::ActiveModel {
            id: Set("o1".to_string()),
            question_id: Set("q1".to_string()),
            text: Set("Otter".to_string()),
            option_order: Set(0),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    let ballot = |id: &str| response::ActiveModel {
        id: Set(id.to_string()),
        question_id: Set("q1".to_string()),
        option_id: Set("o1".to_string()),
        voter_id: Set("u2".to_string()),
        created_at: Set(Utc::now().into()),
    };

    responses.create_ballot(vec![ballot("r1")]).await.unwrap();
    assert!(responses.has_voted("u2", &["q1".to_string()]).await.unwrap());

    // Second ballot by the same voter trips the unique index and rolls back.
    let err = responses.create_ballot(vec![ballot("r2")]).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_grant_uniqueness_and_cascade_delete() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::clone(&db.conn);

    let users = UserRepository::new(Arc::clone(&conn));
    let forms = FormRepository::new(Arc::clone(&conn));
    let grants = EditorGrantRepository::new(Arc::clone(&conn));

    users.create(user_model("u1", "alice")).await.unwrap();
    users.create(user_model("u2", "bob")).await.unwrap();
    forms.create(form_model("f1", "u1")).await.unwrap();

    let grant = |id: &str| editor_grant::ActiveModel {
        id: Set(id.to_string()),
        form_id: Set("f1".to_string()),
        user_id: Set("u2".to_string()),
        created_at: Set(Utc::now().into()),
    };

    grants.create(grant("g1")).await.unwrap();
    let err = grants.create(grant("g2")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Deleting the form cascades to grants.
    forms.delete("f1").await.unwrap();
    assert!(grants.find_by_form("f1").await.unwrap().is_empty());
    assert!(forms.find_by_id("f1").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_granted_forms_listing() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::clone(&db.conn);

    let users = UserRepository::new(Arc::clone(&conn));
    let forms = FormRepository::new(Arc::clone(&conn));
    let grants = EditorGrantRepository::new(Arc::clone(&conn));

    users.create(user_model("u1", "alice")).await.unwrap();
    users.create(user_model("u2", "bob")).await.unwrap();
    forms.create(form_model("f1", "u1")).await.unwrap();

    grants
        .create(editor_grant::ActiveModel {
            id: Set("g1".to_string()),
            form_id: Set("f1".to_string()),
            user_id: Set("u2".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await
        .unwrap();

    let granted = forms.find_granted_to("u2").await.unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].id, "f1");

    assert!(forms.find_granted_to("u1").await.unwrap().is_empty());
    assert_eq!(forms.find_by_creator("u1").await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_cleanup() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::clone(&db.conn);

    let users = UserRepository::new(Arc::clone(&conn));
    users.create(user_model("u1", "alice")).await.unwrap();

    db.cleanup().await.unwrap();
    assert!(users.find_by_id("u1").await.unwrap().is_none());
}
