use crate::common::Result;
use crate::core::{login_required, Notice};
use crate::service::protocol::{logs_path, AttendanceRecord};
use crate::service::CallOptions;
use crate::session::SessionStore;

/// Most recent attendance records, as last fetched.
pub struct RecordsView {
    session: SessionStore,
    limit: u32,
    records: Vec<AttendanceRecord>,
}

impl RecordsView {
    pub fn new(session: SessionStore, limit: u32) -> Self {
        Self { session, limit, records: Vec::new() }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// On failure the previous list is dropped rather than shown stale.
    pub async fn refresh(&mut self) -> Notice {
        match self.fetch().await {
            Ok(records) => {
                self.records = records;
                Notice::Success(format!("Loaded {} attendance records", self.records.len()))
            }
            Err(e) => {
                tracing::warn!("Fetching attendance logs failed: {}", e);
                self.records.clear();
                Notice::failure(&e)
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<AttendanceRecord>> {
        let session = self.session.snapshot();
        let token = session.token().ok_or_else(login_required)?;

        let mut records: Vec<AttendanceRecord> = self.session
            .gateway()
            .call_as(&logs_path(self.limit), CallOptions::get().with_token(Some(token)))
            .await?;
        records.truncate(self.limit as usize);
        Ok(records)
    }
}
