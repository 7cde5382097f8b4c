mod common;

use std::sync::Arc;

use attendance_client::service::protocol::{enroll_path, AccountRole, USERS_PATH};
use attendance_client::service::RequestBody;
use attendance_client::{CaptureBuffer, EnrollmentState, EnrollmentWorkflow};
use common::{login, test_frame, token_with, StubTransport};
use serde_json::json;

fn face() -> CaptureBuffer {
    CaptureBuffer::from_frame(&test_frame(), 90).unwrap()
}

fn fill_draft(workflow: &mut EnrollmentWorkflow, name: &str, roll: &str) {
    workflow.draft.full_name = name.to_string();
    workflow.draft.roll_no = roll.to_string();
    workflow.draft.password = "pw".to_string();
}

#[tokio::test]
async fn enrolling_before_creating_a_user_is_rejected_locally() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    let mut workflow = EnrollmentWorkflow::new(session);
    workflow.select_image(face());

    let notice = workflow.enroll_face().await;
    assert!(!notice.is_success());
    assert_eq!(notice.text(), "Create a user before enrolling a face");
    assert!(stub.calls().iter().all(|r| !r.url.path().starts_with(USERS_PATH)));
}

#[tokio::test]
async fn create_then_enroll_walks_the_states() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    stub.route(USERS_PATH, 201, r#"{"id":42,"full_name":"Ada Lovelace","roll_no":"R-1","role":"STUDENT"}"#);
    stub.route(&enroll_path(42), 200, r#"{"status":"ok","model_version":"arcface-v2","liveness_score":0.97}"#);

    let mut workflow = EnrollmentWorkflow::new(session);
    assert_eq!(workflow.state(), &EnrollmentState::Idle);
    fill_draft(&mut workflow, " Ada Lovelace ", "R-1");

    let created = workflow.create_user().await;
    assert!(created.is_success(), "{created}");
    assert!(created.text().contains("id 42"));
    assert_eq!(workflow.state(), &EnrollmentState::UserCreated { user_id: 42 });
    assert!(workflow.draft.full_name.is_empty());
    assert!(workflow.draft.password.is_empty());

    let request = stub.last_for(USERS_PATH).unwrap();
    match request.body {
        RequestBody::Json(body) => assert_eq!(
            body,
            json!({"full_name": "Ada Lovelace", "roll_no": "R-1", "password": "pw", "role": "STUDENT"})
        ),
        other => panic!("expected json body, got {other:?}"),
    }

    workflow.select_image(face());
    let enrolled = workflow.enroll_face().await;
    assert!(enrolled.is_success(), "{enrolled}");
    assert!(enrolled.text().contains("arcface-v2"));
    assert!(enrolled.text().contains("0.97"));
    assert_eq!(
        workflow.state(),
        &EnrollmentState::Enrolled { user_id: 42, model_version: "arcface-v2".into() }
    );
    assert!(workflow.selected_image().is_none());

    match stub.last_for(&enroll_path(42)).unwrap().body {
        RequestBody::Multipart(parts) => {
            assert_eq!(parts[0].field, "file");
            assert_eq!(parts[0].file_name, "face.jpg");
        }
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[tokio::test]
async fn incomplete_draft_never_reaches_the_backend() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    let mut workflow = EnrollmentWorkflow::new(session);
    workflow.draft.full_name = "Ada".into();

    let notice = workflow.create_user().await;
    assert_eq!(notice.text(), "Full name, roll number and password are required");
    assert_eq!(stub.count_for(USERS_PATH), 0);
    assert_eq!(workflow.state(), &EnrollmentState::Idle);
}

#[tokio::test]
async fn non_admin_cannot_create_users() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "alice", "opaque").await;
    let mut workflow = EnrollmentWorkflow::new(session);
    fill_draft(&mut workflow, "Bob", "R-2");

    let notice = workflow.create_user().await;
    assert_eq!(notice.text(), "Admin access required");
    assert_eq!(stub.count_for(USERS_PATH), 0);
}

#[tokio::test]
async fn admin_role_claim_is_honoured_for_any_username() {
    let stub = Arc::new(StubTransport::new());
    let token = token_with(json!({"sub": "7", "role": "ADMIN"}));
    let session = login(&stub, "registrar", &token).await;
    stub.route(USERS_PATH, 201, r#"{"id":8}"#);

    let mut workflow = EnrollmentWorkflow::new(session);
    fill_draft(&mut workflow, "Bob", "R-2");
    workflow.draft.role = AccountRole::Staff;

    assert!(workflow.create_user().await.is_success());
    assert_eq!(workflow.pending_user_id(), Some(8));
}

#[tokio::test]
async fn failed_enrollment_keeps_user_and_image_for_retry() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    stub.route(USERS_PATH, 201, r#"{"id":5}"#);
    stub.route(&enroll_path(5), 400, r#"{"detail":"No face detected"}"#);

    let mut workflow = EnrollmentWorkflow::new(session);
    fill_draft(&mut workflow, "Cy", "R-3");
    workflow.create_user().await;
    workflow.select_image(face());

    let failed = workflow.enroll_face().await;
    assert_eq!(failed.text(), "No face detected");
    assert_eq!(workflow.state(), &EnrollmentState::UserCreated { user_id: 5 });
    assert!(workflow.selected_image().is_some());

    stub.route(&enroll_path(5), 200, r#"{"model_version":"v1"}"#);
    let retried = workflow.enroll_face().await;
    assert!(retried.is_success());
    assert!(retried.text().contains("not reported"));
    assert_eq!(stub.count_for(&enroll_path(5)), 2);
    assert_eq!(stub.count_for(USERS_PATH), 1);
}

#[tokio::test]
async fn creating_another_user_targets_the_new_account() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    stub.route(USERS_PATH, 201, r#"{"id":10}"#);

    let mut workflow = EnrollmentWorkflow::new(session);
    fill_draft(&mut workflow, "One", "R-10");
    workflow.create_user().await;
    workflow.select_image(face());

    stub.route(USERS_PATH, 201, r#"{"id":11}"#);
    fill_draft(&mut workflow, "Two", "R-11");
    workflow.create_user().await;

    assert_eq!(workflow.state(), &EnrollmentState::UserCreated { user_id: 11 });
    assert!(workflow.selected_image().is_none());
}

#[tokio::test]
async fn discard_resets_everything() {
    let stub = Arc::new(StubTransport::new());
    let session = login(&stub, "admin", "opaque").await;
    stub.route(USERS_PATH, 201, r#"{"id":3}"#);

    let mut workflow = EnrollmentWorkflow::new(session);
    fill_draft(&mut workflow, "Dee", "R-4");
    workflow.create_user().await;
    workflow.select_image(face());
    workflow.draft.full_name = "half typed".into();

    workflow.discard();
    assert_eq!(workflow.state(), &EnrollmentState::Idle);
    assert!(workflow.selected_image().is_none());
    assert!(workflow.draft.full_name.is_empty());
    assert_eq!(workflow.draft.role, AccountRole::Student);
}
