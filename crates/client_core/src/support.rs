use std::sync::Arc;

use shared::{domain::ComplaintId, protocol::SupportOutcome};
use tracing::info;

use crate::{error::ClientError, list_state::ComplaintList, transport::ApiTransport};

#[derive(Clone)]
pub struct SupportToggle {
    transport: Arc<ApiTransport>,
}

impl SupportToggle {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    pub async fn toggle(&self, complaint_id: ComplaintId) -> Result<SupportOutcome, ClientError> {
        let outcome: SupportOutcome = self
            .transport
            .post(&format!("/complaints/{complaint_id}/support"))
            .send_json()
            .await?;
        info!(
            complaint_id = complaint_id.0,
            status = ?outcome.status,
            support_count = outcome.support_count,
            "support: toggled"
        );
        Ok(outcome)
    }

    pub async fn toggle_in(
        &self,
        list: &mut ComplaintList,
        complaint_id: ComplaintId,
    ) -> Result<SupportOutcome, ClientError> {
        let outcome = self.toggle(complaint_id).await?;
        list.apply_support(complaint_id, outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/support_tests.rs"]
mod tests;
