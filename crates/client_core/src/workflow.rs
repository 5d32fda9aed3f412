use std::{fmt, sync::Arc};

use serde::Serialize;
use shared::{
    domain::{AssignmentId, AssignmentStatus, CategoryId, ComplaintId, ComplaintStatus, UserId},
    protocol::{
        Assignment, AssignmentPayload, Complaint, Photo, SolutionPhotosResponse, Worker,
    },
};
use tracing::{info, warn};

use crate::{
    complaints::{normalize_complaint, photo_form, PhotoUpload},
    error::{ClientError, TransitionError, ValidationError},
    transport::ApiTransport,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    Reject,
    Assign,
    Start,
    Resolve,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 4] = [
        WorkflowAction::Reject,
        WorkflowAction::Assign,
        WorkflowAction::Start,
        WorkflowAction::Resolve,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::Reject => "reject",
            WorkflowAction::Assign => "assign",
            WorkflowAction::Start => "start",
            WorkflowAction::Resolve => "resolve",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(current status, action) -> next status`.
///
/// Terminal statuses refuse every action regardless of which one is asked for.
pub fn transition(
    current: ComplaintStatus,
    action: WorkflowAction,
) -> Result<ComplaintStatus, TransitionError> {
    use ComplaintStatus::*;
    use WorkflowAction::*;

    if current.is_terminal() {
        return Err(TransitionError::Terminal {
            status: current,
            action,
        });
    }
    match (current, action) {
        (Pending | Assigned | InProgress, Reject) => Ok(Rejected),
        (Pending | Assigned | InProgress, Assign) => Ok(Assigned),
        (Assigned, Start) => Ok(InProgress),
        (InProgress, Resolve) => Ok(Resolved),
        _ => Err(TransitionError::NotAllowed {
            status: current,
            action,
        }),
    }
}

pub fn permitted_actions(status: ComplaintStatus) -> Vec<WorkflowAction> {
    WorkflowAction::ALL
        .into_iter()
        .filter(|action| transition(status, *action).is_ok())
        .collect()
}

fn assignment_status(assignment: &Assignment) -> ComplaintStatus {
    if assignment.complaint.status.is_terminal() {
        assignment.complaint.status
    } else {
        assignment.status.complaint_status()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerRoster {
    active: Vec<Worker>,
    inactive: Vec<UserId>,
}

impl WorkerRoster {
    pub fn new(workers: Vec<Worker>) -> Self {
        let (active, inactive): (Vec<_>, Vec<_>) =
            workers.into_iter().partition(|worker| worker.is_active);
        Self {
            active,
            inactive: inactive.into_iter().map(|worker| worker.user_id).collect(),
        }
    }

    pub fn workers(&self) -> &[Worker] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn worker(&self, employee_id: UserId) -> Result<&Worker, ValidationError> {
        if let Some(worker) = self.active.iter().find(|w| w.user_id == employee_id) {
            return Ok(worker);
        }
        if self.inactive.contains(&employee_id) {
            return Err(ValidationError::InactiveWorker(employee_id));
        }
        Err(ValidationError::UnknownWorker(employee_id))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OfficialFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ComplaintStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

#[derive(Serialize)]
struct RejectQuery<'a> {
    reason: &'a str,
}

#[derive(Serialize)]
struct AssignQuery {
    employee_id: UserId,
}

#[derive(Clone)]
pub struct AssignmentWorkflow {
    transport: Arc<ApiTransport>,
}

impl AssignmentWorkflow {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    pub async fn list_official_complaints(
        &self,
        filter: OfficialFilter,
    ) -> Result<Vec<Complaint>, ClientError> {
        let complaints: Vec<Complaint> = self
            .transport
            .get("/official/complaints")
            .query(&filter)
            .send_json()
            .await?;
        Ok(complaints
            .into_iter()
            .map(|complaint| normalize_complaint(&self.transport, complaint))
            .collect())
    }

    pub async fn official_complaint(&self, id: ComplaintId) -> Result<Complaint, ClientError> {
        let complaint: Complaint = self
            .transport
            .get(&format!("/official/complaints/{id}"))
            .send_json()
            .await?;
        Ok(normalize_complaint(&self.transport, complaint))
    }

    pub async fn load_roster(&self) -> Result<WorkerRoster, ClientError> {
        let workers: Vec<Worker> = self
            .transport
            .get("/official/employees")
            .send_json()
            .await?;
        let roster = WorkerRoster::new(workers);
        info!(active = roster.workers().len(), "workflow: roster loaded");
        Ok(roster)
    }

    /// Rejects with a mandatory reason. Blank reasons and terminal complaints
    /// are refused without a request.
    pub async fn reject(&self, complaint: &Complaint, reason: &str) -> Result<Complaint, ClientError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::BlankRejectReason.into());
        }
        transition(complaint.status, WorkflowAction::Reject)?;

        let updated: Complaint = self
            .transport
            .post(&format!("/official/complaints/{}/reject", complaint.id))
            .query(&RejectQuery { reason })
            .send_json()
            .await?;
        info!(complaint_id = complaint.id.0, "workflow: complaint rejected");
        Ok(normalize_complaint(&self.transport, updated))
    }

    pub async fn assign(
        &self,
        complaint: &Complaint,
        roster: &WorkerRoster,
        employee_id: UserId,
    ) -> Result<Complaint, ClientError> {
        transition(complaint.status, WorkflowAction::Assign)?;
        let worker = roster.worker(employee_id)?;

        let updated: Complaint = self
            .transport
            .post(&format!("/official/complaints/{}/assign", complaint.id))
            .query(&AssignQuery {
                employee_id: worker.user_id,
            })
            .send_json()
            .await?;
        info!(
            complaint_id = complaint.id.0,
            employee_id = worker.user_id.0,
            "workflow: complaint assigned"
        );
        Ok(normalize_complaint(&self.transport, updated))
    }

    pub async fn list_assigned(&self) -> Result<Vec<Assignment>, ClientError> {
        self.fetch_assignments("/employee/complaints/assigned").await
    }

    pub async fn list_completed(&self) -> Result<Vec<Assignment>, ClientError> {
        self.fetch_assignments("/employee/complaints/completed").await
    }

    pub async fn assignment(&self, id: AssignmentId) -> Result<Assignment, ClientError> {
        let payload: AssignmentPayload = self
            .transport
            .get(&format!("/employee/assignments/{id}"))
            .send_json()
            .await?;
        let mut assignment = Assignment::from(payload);
        assignment.complaint.photos = self.complaint_photos(assignment.complaint_id()).await;
        Ok(self.normalize(assignment))
    }

    async fn complaint_photos(&self, complaint_id: ComplaintId) -> Vec<Photo> {
        match self
            .transport
            .get(&format!("/complaints/{complaint_id}/photos"))
            .send_json::<Vec<Photo>>()
            .await
        {
            Ok(photos) => photos,
            Err(err) => {
                warn!(
                    complaint_id = complaint_id.0,
                    "workflow: complaint photos unavailable: {err}"
                );
                Vec::new()
            }
        }
    }

    pub async fn start(&self, assignment: &mut Assignment) -> Result<(), ClientError> {
        let next = transition(assignment_status(assignment), WorkflowAction::Start)?;
        self.transport
            .post(&format!("/employee/assignments/{}/start", assignment.id))
            .send_unit()
            .await?;

        assignment.status = AssignmentStatus::InProgress;
        assignment.complaint.status = next;
        info!(
            assignment_id = assignment.id.0,
            complaint_id = assignment.complaint_id().0,
            "workflow: assignment started"
        );
        Ok(())
    }

    pub async fn submit_solution_photos(
        &self,
        assignment: &mut Assignment,
        files: Vec<PhotoUpload>,
    ) -> Result<Vec<String>, ClientError> {
        if files.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }
        transition(assignment_status(assignment), WorkflowAction::Resolve)?;

        let count = files.len();
        let response: SolutionPhotosResponse = self
            .transport
            .post(&format!(
                "/employee/assignments/{}/solution-photos",
                assignment.id
            ))
            .multipart(photo_form(files)?)
            .send_json()
            .await?;

        let urls: Vec<String> = response
            .solution_photo_urls
            .iter()
            .map(|url| self.transport.resolve_photo_url(url))
            .collect();
        assignment.solution_photo_urls = urls.clone();
        assignment.status = response
            .assignment_status
            .unwrap_or(AssignmentStatus::Completed);
        assignment.complaint.status = assignment.status.complaint_status();
        info!(
            assignment_id = assignment.id.0,
            uploaded = count,
            stored = urls.len(),
            "workflow: solution photos submitted"
        );
        Ok(urls)
    }

    async fn fetch_assignments(&self, path: &str) -> Result<Vec<Assignment>, ClientError> {
        let payloads: Vec<AssignmentPayload> = self.transport.get(path).send_json().await?;
        Ok(payloads
            .into_iter()
            .map(|payload| self.normalize_assignment(payload))
            .collect())
    }

    fn normalize_assignment(&self, payload: AssignmentPayload) -> Assignment {
        self.normalize(Assignment::from(payload))
    }

    fn normalize(&self, mut assignment: Assignment) -> Assignment {
        assignment.complaint = normalize_complaint(&self.transport, assignment.complaint);
        for url in &mut assignment.solution_photo_urls {
            *url = self.transport.resolve_photo_url(url);
        }
        assignment
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
