use shared::{
    domain::{AssignmentId, ComplaintId, FeedSort, GeoPoint, PhotoId, Role, UserId},
    protocol::{Assignment, Category, Complaint, ComplaintDraft, SupportOutcome, User},
};

use crate::{
    complaints::{ComplaintRepository, PhotoUpload, SubmittedComplaint},
    error::{ClientError, ValidationError},
    list_state::ComplaintList,
    support::SupportToggle,
    workflow::{AssignmentWorkflow, OfficialFilter, WorkerRoster},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    CitizenHome,
    Feed,
    CreateComplaint,
    MyComplaints,
    Profile,
    OfficialHome,
    OfficialComplaintDetail,
    Workers,
    EmployeeHome,
    EmployeeJobDetail,
    EmployeeCompleted,
    AdminHome,
    AdminOfficials,
    AdminCategories,
    AdminUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SubmitComplaint,
    ListMine,
    ListFeed,
    ToggleSupport,
    DeleteComplaint,
    DeletePhoto,
    ListOfficialComplaints,
    LoadRoster,
    RejectComplaint,
    AssignComplaint,
    ListAssigned,
    ListCompleted,
    StartAssignment,
    SubmitSolutionPhotos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSurface {
    pub role: Role,
    pub home: Screen,
    pub screens: &'static [Screen],
    pub operations: &'static [Operation],
}

impl WorkflowSurface {
    pub fn permits(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }

    pub fn reaches(&self, screen: Screen) -> bool {
        self.screens.contains(&screen)
    }
}

pub const ANONYMOUS_SCREENS: &[Screen] = &[
    Screen::Login,
    Screen::Register,
    Screen::ForgotPassword,
    Screen::ResetPassword,
];

const CITIZEN_SCREENS: &[Screen] = &[
    Screen::CitizenHome,
    Screen::Feed,
    Screen::CreateComplaint,
    Screen::MyComplaints,
    Screen::Profile,
];
const CITIZEN_OPERATIONS: &[Operation] = &[
    Operation::SubmitComplaint,
    Operation::ListMine,
    Operation::ListFeed,
    Operation::ToggleSupport,
    Operation::DeleteComplaint,
    Operation::DeletePhoto,
];

const EMPLOYEE_SCREENS: &[Screen] = &[
    Screen::EmployeeHome,
    Screen::EmployeeJobDetail,
    Screen::EmployeeCompleted,
    Screen::Profile,
];
const EMPLOYEE_OPERATIONS: &[Operation] = &[
    Operation::ListAssigned,
    Operation::ListCompleted,
    Operation::StartAssignment,
    Operation::SubmitSolutionPhotos,
];

const OFFICIAL_SCREENS: &[Screen] = &[
    Screen::OfficialHome,
    Screen::OfficialComplaintDetail,
    Screen::Workers,
    Screen::Profile,
];
const OFFICIAL_OPERATIONS: &[Operation] = &[
    Operation::ListOfficialComplaints,
    Operation::LoadRoster,
    Operation::RejectComplaint,
    Operation::AssignComplaint,
];

const ADMIN_SCREENS: &[Screen] = &[
    Screen::AdminHome,
    Screen::AdminOfficials,
    Screen::AdminCategories,
    Screen::AdminUsers,
    Screen::OfficialComplaintDetail,
    Screen::Profile,
];

pub struct RoleRouter;

impl RoleRouter {
    pub fn route(role: Role) -> WorkflowSurface {
        match role {
            Role::Citizen => WorkflowSurface {
                role,
                home: Screen::CitizenHome,
                screens: CITIZEN_SCREENS,
                operations: CITIZEN_OPERATIONS,
            },
            Role::Employee => WorkflowSurface {
                role,
                home: Screen::EmployeeHome,
                screens: EMPLOYEE_SCREENS,
                operations: EMPLOYEE_OPERATIONS,
            },
            Role::Official => WorkflowSurface {
                role,
                home: Screen::OfficialHome,
                screens: OFFICIAL_SCREENS,
                operations: OFFICIAL_OPERATIONS,
            },
            Role::Admin => WorkflowSurface {
                role,
                home: Screen::AdminHome,
                screens: ADMIN_SCREENS,
                operations: OFFICIAL_OPERATIONS,
            },
        }
    }

    pub fn entry_screen(user: Option<&User>) -> Screen {
        user.map(|user| Self::route(user.role).home)
            .unwrap_or(Screen::Login)
    }

    pub(crate) fn desk(
        user: User,
        complaints: ComplaintRepository,
        support: SupportToggle,
        workflow: AssignmentWorkflow,
    ) -> Desk {
        match user.role {
            Role::Citizen => Desk::Citizen(CitizenDesk {
                user,
                complaints,
                support,
            }),
            Role::Employee => Desk::Employee(FieldDesk { user, workflow }),
            Role::Official => Desk::Official(OfficialDesk { user, workflow }),
            Role::Admin => Desk::Admin(OfficialDesk { user, workflow }),
        }
    }
}

pub enum Desk {
    Citizen(CitizenDesk),
    Employee(FieldDesk),
    Official(OfficialDesk),
    Admin(OfficialDesk),
}

impl Desk {
    pub fn role(&self) -> Role {
        match self {
            Desk::Citizen(_) => Role::Citizen,
            Desk::Employee(_) => Role::Employee,
            Desk::Official(_) => Role::Official,
            Desk::Admin(_) => Role::Admin,
        }
    }

    pub fn surface(&self) -> WorkflowSurface {
        RoleRouter::route(self.role())
    }

    pub fn user(&self) -> &User {
        match self {
            Desk::Citizen(desk) => &desk.user,
            Desk::Employee(desk) => &desk.user,
            Desk::Official(desk) | Desk::Admin(desk) => &desk.user,
        }
    }
}

pub struct CitizenDesk {
    user: User,
    complaints: ComplaintRepository,
    support: SupportToggle,
}

impl CitizenDesk {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.complaints.list_categories().await
    }

    pub async fn submit(
        &self,
        draft: &ComplaintDraft,
        files: Vec<PhotoUpload>,
    ) -> Result<SubmittedComplaint, ClientError> {
        if !self.user.profile_completed {
            return Err(ValidationError::ProfileIncomplete.into());
        }
        self.complaints.submit(draft, files).await
    }

    pub async fn my_complaints(&self) -> Result<ComplaintList, ClientError> {
        Ok(self.complaints.list_mine().await?.into())
    }

    pub async fn feed(
        &self,
        sort: FeedSort,
        origin: Option<GeoPoint>,
    ) -> Result<ComplaintList, ClientError> {
        Ok(self.complaints.list_feed(sort, origin).await?.into())
    }

    pub async fn toggle_support(
        &self,
        list: &mut ComplaintList,
        id: ComplaintId,
    ) -> Result<SupportOutcome, ClientError> {
        self.support.toggle_in(list, id).await
    }

    pub async fn delete(&self, list: &mut ComplaintList, id: ComplaintId) -> Result<(), ClientError> {
        self.complaints.delete_from(list, id).await
    }

    pub async fn delete_photo(
        &self,
        list: &mut ComplaintList,
        photo_id: PhotoId,
    ) -> Result<(), ClientError> {
        self.complaints.delete_photo_from(list, photo_id).await
    }
}

pub struct FieldDesk {
    user: User,
    workflow: AssignmentWorkflow,
}

impl FieldDesk {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub async fn assigned(&self) -> Result<Vec<Assignment>, ClientError> {
        self.workflow.list_assigned().await
    }

    pub async fn completed(&self) -> Result<Vec<Assignment>, ClientError> {
        self.workflow.list_completed().await
    }

    pub async fn assignment(&self, id: AssignmentId) -> Result<Assignment, ClientError> {
        self.workflow.assignment(id).await
    }

    pub async fn start(&self, assignment: &mut Assignment) -> Result<(), ClientError> {
        self.workflow.start(assignment).await
    }

    pub async fn submit_solution(
        &self,
        assignment: &mut Assignment,
        files: Vec<PhotoUpload>,
    ) -> Result<Vec<String>, ClientError> {
        self.workflow.submit_solution_photos(assignment, files).await
    }
}

pub struct OfficialDesk {
    user: User,
    workflow: AssignmentWorkflow,
}

impl OfficialDesk {
    pub fn user(&self) -> &User {
        &self.user
    }

    pub async fn inbox(&self, filter: OfficialFilter) -> Result<ComplaintList, ClientError> {
        Ok(self.workflow.list_official_complaints(filter).await?.into())
    }

    pub async fn complaint(&self, id: ComplaintId) -> Result<Complaint, ClientError> {
        self.workflow.official_complaint(id).await
    }

    pub async fn roster(&self) -> Result<WorkerRoster, ClientError> {
        self.workflow.load_roster().await
    }

    pub async fn reject(
        &self,
        list: &mut ComplaintList,
        complaint: &Complaint,
        reason: &str,
    ) -> Result<Complaint, ClientError> {
        let updated = self.workflow.reject(complaint, reason).await?;
        list.merge(updated.clone());
        Ok(updated)
    }

    pub async fn assign(
        &self,
        list: &mut ComplaintList,
        complaint: &Complaint,
        roster: &WorkerRoster,
        employee_id: UserId,
    ) -> Result<Complaint, ClientError> {
        let updated = self.workflow.assign(complaint, roster, employee_id).await?;
        list.merge(updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
