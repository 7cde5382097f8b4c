use crate::camera::CaptureBuffer;
use crate::common::{AttendanceError, Result};
use crate::core::{admin_required, login_required, Notice};
use crate::service::protocol::{
    enroll_path, AccountRole, CreateUserRequest, EnrollResponse, UserOut, UPLOAD_FIELD, USERS_PATH,
};
use crate::service::{CallOptions, RequestBody};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentState {
    Idle,
    UserCreated { user_id: i64 },
    Enrolled { user_id: i64, model_version: String },
}

/// Fields of the "add user" form.
#[derive(Debug, Clone, Default)]
pub struct NewUserDraft {
    pub full_name: String,
    pub roll_no: String,
    pub password: String,
    pub role: AccountRole,
}

impl NewUserDraft {
    fn is_complete(&self) -> bool {
        !self.full_name.trim().is_empty()
            && !self.roll_no.trim().is_empty()
            && !self.password.is_empty()
    }

    fn clear(&mut self) {
        self.full_name.clear();
        self.roll_no.clear();
        self.password.clear();
    }
}

/// Admin flow: create an account, then bind a face image to it. Enrollment
/// can be retried against the same account without recreating it.
pub struct EnrollmentWorkflow {
    session: SessionStore,
    pub draft: NewUserDraft,
    image: Option<CaptureBuffer>,
    state: EnrollmentState,
}

impl EnrollmentWorkflow {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            draft: NewUserDraft::default(),
            image: None,
            state: EnrollmentState::Idle,
        }
    }

    pub fn state(&self) -> &EnrollmentState {
        &self.state
    }

    pub fn pending_user_id(&self) -> Option<i64> {
        match self.state {
            EnrollmentState::UserCreated { user_id } => Some(user_id),
            _ => None,
        }
    }

    pub fn select_image(&mut self, image: CaptureBuffer) {
        self.image = Some(image);
    }

    pub fn selected_image(&self) -> Option<&CaptureBuffer> {
        self.image.as_ref()
    }

    pub async fn create_user(&mut self) -> Notice {
        match self.submit_new_user().await {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!("Create user failed: {}", e);
                Notice::failure(&e)
            }
        }
    }

    async fn submit_new_user(&mut self) -> Result<Notice> {
        if !self.draft.is_complete() {
            return Err(AttendanceError::Validation(
                "Full name, roll number and password are required".into(),
            ));
        }

        let session = self.session.snapshot();
        let token = session.token().ok_or_else(login_required)?;
        if !session.is_admin() {
            return Err(admin_required());
        }

        let request = CreateUserRequest {
            full_name: self.draft.full_name.trim().to_string(),
            roll_no: self.draft.roll_no.trim().to_string(),
            password: self.draft.password.clone(),
            role: self.draft.role,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| AttendanceError::Protocol(format!("create user body: {}", e)))?;

        let user: UserOut = self.session
            .gateway()
            .call_as(USERS_PATH, CallOptions::post(RequestBody::Json(body)).with_token(Some(token)))
            .await?;

        tracing::info!("Created user {} ({})", user.id, request.full_name);
        self.state = EnrollmentState::UserCreated { user_id: user.id };
        self.image = None;
        self.draft.clear();

        Ok(Notice::Success(format!(
            "User {} created (id {}). Now enroll a face image for this user.",
            request.full_name, user.id
        )))
    }

    pub async fn enroll_face(&mut self) -> Notice {
        match self.submit_face().await {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!("Face enrollment failed: {}", e);
                Notice::failure(&e)
            }
        }
    }

    async fn submit_face(&mut self) -> Result<Notice> {
        let user_id = self.pending_user_id().ok_or_else(|| {
            AttendanceError::Validation("Create a user before enrolling a face".into())
        })?;
        let image = self.image
            .as_ref()
            .ok_or_else(|| AttendanceError::Validation("Select a face image to enroll".into()))?;

        let session = self.session.snapshot();
        let token = session.token().ok_or_else(login_required)?;

        let upload = RequestBody::Multipart(vec![image.to_part(UPLOAD_FIELD)]);
        let enrolled: EnrollResponse = self.session
            .gateway()
            .call_as(&enroll_path(user_id), CallOptions::post(upload).with_token(Some(token)))
            .await?;

        let liveness = enrolled.liveness_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "not reported".to_string());
        tracing::info!("Enrolled face for user {} with {}", user_id, enrolled.model_version);

        let notice = Notice::Success(format!(
            "Face enrolled for user {} (model {}, liveness {})",
            user_id, enrolled.model_version, liveness
        ));
        self.state = EnrollmentState::Enrolled { user_id, model_version: enrolled.model_version };
        self.image = None;
        Ok(notice)
    }

    /// Leaving the admin page drops any half-finished enrollment.
    pub fn discard(&mut self) {
        if self.pending_user_id().is_some() {
            tracing::debug!("Discarding pending enrollment");
        }
        self.state = EnrollmentState::Idle;
        self.image = None;
        self.draft = NewUserDraft::default();
    }
}
