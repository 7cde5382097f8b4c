use crate::common::Result;
use super::{Session, SessionStore};

/// Login page state.
#[derive(Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
}

impl LoginForm {
    pub async fn submit(&mut self, store: &SessionStore) -> Result<Session> {
        match store.login(&self.username, &self.password).await {
            Ok(session) => {
                self.password.clear();
                self.error = None;
                Ok(session)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn logout(&mut self, store: &SessionStore) {
        store.logout();
        self.username.clear();
        self.password.clear();
        self.error = None;
    }
}
