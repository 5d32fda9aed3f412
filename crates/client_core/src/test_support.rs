use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::{
        AssignmentId, AssignmentStatus, CategoryId, ComplaintId, ComplaintStatus, PhotoId,
        PhotoKind, Priority, Role, UserId, WorkerId,
    },
    protocol::{
        AssignmentPayload, Category, Complaint, CreateComplaintRequest, Credentials,
        ForgotPasswordRequest, Photo, ProfileUpdate, RegisterRequest, ResetPasswordRequest, User, Worker,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::{config::ClientConfig, session::SessionStore, CityFlowClient};

pub(crate) const CITIZEN_TOKEN: &str = "citizen-token";
pub(crate) const NEWCOMER_TOKEN: &str = "newcomer-token";
pub(crate) const EMPLOYEE_TOKEN: &str = "employee-token";
pub(crate) const OFFICIAL_TOKEN: &str = "official-token";
pub(crate) const ADMIN_TOKEN: &str = "admin-token";
pub(crate) const EXPIRED_RESET_TOKEN: &str = "expired";

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Account {
    pub password: String,
    pub token: String,
    pub user: User,
    pub profile: ProfileUpdate,
}

#[derive(Debug, Clone)]
pub(crate) struct AssignmentRecord {
    pub id: AssignmentId,
    pub complaint_id: ComplaintId,
    pub employee_id: UserId,
    pub status: AssignmentStatus,
    pub solution_urls: Vec<String>,
}

#[derive(Default)]
pub(crate) struct CityState {
    pub accounts: Vec<Account>,
    pub complaints: BTreeMap<i64, Complaint>,
    pub supported: HashSet<i64>,
    pub assignments: BTreeMap<i64, AssignmentRecord>,
    pub workers: Vec<Worker>,
    pub categories: Vec<Category>,
    pub requests: Vec<RecordedRequest>,
    pub fail_photo_uploads: bool,
    pub fail_photo_listing: bool,
    pub response_delay: Option<Duration>,
    pub next_id: i64,
}

impl CityState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn caller(&self, headers: &HeaderMap) -> Result<User, (StatusCode, Json<Value>)> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        self.accounts
            .iter()
            .find(|account| Some(account.token.as_str()) == token)
            .map(|account| account.user.clone())
            .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }

    fn caller_with_role(
        &self,
        headers: &HeaderMap,
        roles: &[Role],
    ) -> Result<User, (StatusCode, Json<Value>)> {
        let user = self.caller(headers)?;
        if !roles.contains(&user.role) {
            return Err(failure(StatusCode::FORBIDDEN, "Not enough permissions"));
        }
        Ok(user)
    }

    fn assignment_payload(&self, record: &AssignmentRecord) -> Option<AssignmentPayload> {
        let mut complaint = self.complaints.get(&record.complaint_id.0)?.clone();
        complaint.photos.clear();
        let solution_photo_url = if record.solution_urls.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&record.solution_urls).expect("encode urls"))
        };
        Some(AssignmentPayload {
            assignment_id: record.id,
            assignment_status: record.status,
            solution_photo_url,
            complaint,
        })
    }
}

type Shared = Arc<Mutex<CityState>>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn failure(status: StatusCode, detail: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail })))
}

pub(crate) fn user(id: i64, role: Role, email: &str, profile_completed: bool) -> User {
    User {
        id: UserId(id),
        role,
        full_name: Some(format!("{role} {id}")),
        email: email.to_string(),
        phone_number: None,
        avatar_url: None,
        profile_completed,
        is_active: true,
    }
}

pub(crate) fn complaint(id: i64, owner: UserId, status: ComplaintStatus, support_count: u32) -> Complaint {
    Complaint {
        id: ComplaintId(id),
        user_id: Some(owner),
        title: Some(format!("Complaint {id}")),
        description: "Broken pavement".to_string(),
        category_id: Some(CategoryId(3)),
        category: None,
        status,
        priority: Priority::Medium,
        latitude: Some(41.01),
        longitude: Some(28.97),
        is_anonymous: false,
        support_count,
        reject_reason: None,
        photos: Vec::new(),
        resolution_photos: Vec::new(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub(crate) struct FakeCity {
    pub url: String,
    pub state: Shared,
}

impl FakeCity {
    pub async fn spawn() -> Self {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state: Shared = Arc::new(Mutex::new(seeded_state()));

        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/auth/register", post(register))
            .route("/auth/forgot-password", post(forgot_password))
            .route("/auth/reset-password", post(reset_password))
            .route("/users/me", put(update_profile))
            .route("/categories", get(categories))
            .route("/complaints", post(create_complaint))
            .route("/complaints/my", get(my_complaints))
            .route("/complaints/feed", get(feed))
            .route("/complaints/:id", delete(delete_complaint))
            .route(
                "/complaints/:id/photos",
                get(complaint_photos).post(upload_complaint_photos),
            )
            .route("/complaints/:id/support", post(toggle_support))
            .route("/complaints/photos/:id", delete(delete_photo))
            .route("/official/complaints", get(official_complaints))
            .route("/official/complaints/:id", get(official_complaint))
            .route("/official/complaints/:id/reject", post(reject_complaint))
            .route("/official/complaints/:id/assign", post(assign_complaint))
            .route("/official/employees", get(employees))
            .route("/employee/complaints/assigned", get(assigned_jobs))
            .route("/employee/complaints/completed", get(completed_jobs))
            .route("/employee/assignments/:id", get(assignment))
            .route("/employee/assignments/:id/start", post(start_assignment))
            .route(
                "/employee/assignments/:id/solution-photos",
                post(upload_solution_photos),
            )
            .with_state(Arc::clone(&state))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), record));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(&self.url)
            .expect("config")
            .with_request_timeout(Duration::from_secs(5))
    }

    pub async fn client(&self, token: Option<&str>) -> CityFlowClient {
        let session = SessionStore::ephemeral();
        if let Some(token) = token {
            let user = self.user_for(token).await;
            session
                .establish(shared::protocol::Session {
                    token: token.to_string(),
                    user,
                })
                .await
                .expect("establish session");
        }
        CityFlowClient::with_session(self.config(), session).expect("client")
    }

    pub async fn user_for(&self, token: &str) -> Option<User> {
        self.state
            .lock()
            .await
            .accounts
            .iter()
            .find(|account| account.token == token)
            .map(|account| account.user.clone())
    }

    pub async fn seed_complaint(&self, status: ComplaintStatus, support_count: u32) -> Complaint {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        let record = complaint(id, UserId(1), status, support_count);
        state.complaints.insert(id, record.clone());
        record
    }

    pub async fn seed_assignment(&self, status: AssignmentStatus) -> (AssignmentId, ComplaintId) {
        let mut state = self.state.lock().await;
        let complaint_id = state.next_id();
        state.complaints.insert(
            complaint_id,
            complaint(complaint_id, UserId(1), status.complaint_status(), 0),
        );
        let id = state.next_id();
        state.assignments.insert(
            id,
            AssignmentRecord {
                id: AssignmentId(id),
                complaint_id: ComplaintId(complaint_id),
                employee_id: UserId(21),
                status,
                solution_urls: Vec::new(),
            },
        );
        (AssignmentId(id), ComplaintId(complaint_id))
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn count(&self, method: &str, path: &str) -> usize {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub async fn stored_complaint(&self, id: ComplaintId) -> Option<Complaint> {
        self.state.lock().await.complaints.get(&id.0).cloned()
    }
}

fn seeded_state() -> CityState {
    let account = |id, role, email: &str, token: &str, completed| Account {
        password: "secret1".to_string(),
        token: token.to_string(),
        user: user(id, role, email, completed),
        profile: ProfileUpdate::default(),
    };
    CityState {
        accounts: vec![
            account(1, Role::Citizen, "ayse@example.com", CITIZEN_TOKEN, true),
            account(2, Role::Citizen, "newcomer@example.com", NEWCOMER_TOKEN, false),
            account(21, Role::Employee, "mehmet@example.com", EMPLOYEE_TOKEN, true),
            account(31, Role::Official, "official@example.com", OFFICIAL_TOKEN, true),
            account(41, Role::Admin, "admin@example.com", ADMIN_TOKEN, true),
        ],
        workers: vec![
            Worker {
                id: WorkerId(1),
                user_id: UserId(21),
                full_name: "Mehmet Demir".to_string(),
                is_active: true,
                category_id: Some(CategoryId(3)),
            },
            Worker {
                id: WorkerId(2),
                user_id: UserId(22),
                full_name: "Ali Kaya".to_string(),
                is_active: false,
                category_id: Some(CategoryId(3)),
            },
        ],
        categories: vec![
            Category {
                id: CategoryId(3),
                name: "Roads".to_string(),
                is_active: true,
            },
            Category {
                id: CategoryId(4),
                name: "Lighting".to_string(),
                is_active: false,
            },
        ],
        next_id: 100,
        ..CityState::default()
    }
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let entry = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: request.uri().query().map(str::to_string),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };
    let delay = {
        let mut state = state.lock().await;
        state.requests.push(entry);
        state.response_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    next.run(request).await
}

async fn login(State(state): State<Shared>, Json(credentials): Json<Credentials>) -> Reply {
    let state = state.lock().await;
    let account = state
        .accounts
        .iter()
        .find(|account| {
            account.user.email == credentials.email && account.password == credentials.password
        })
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    Ok(Json(json!({ "access_token": account.token, "token_type": "bearer" })))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = state.lock().await;
    Ok(Json(json!(state.caller(&headers)?)))
}

async fn register(State(state): State<Shared>, Json(request): Json<RegisterRequest>) -> Reply {
    let mut state = state.lock().await;
    if state.accounts.iter().any(|account| account.user.email == request.email) {
        return Err(failure(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let id = state.next_id();
    state.accounts.push(Account {
        password: request.password,
        token: format!("token-{id}"),
        user: user(id, request.role, &request.email, false),
        profile: ProfileUpdate::default(),
    });
    Ok(Json(json!({ "message": "registered", "user_id": id })))
}

async fn forgot_password(Json(_request): Json<ForgotPasswordRequest>) -> Reply {
    Ok(Json(json!({ "message": "If the address exists, a reset link was sent." })))
}

async fn reset_password(Json(request): Json<ResetPasswordRequest>) -> Reply {
    if request.token == EXPIRED_RESET_TOKEN {
        return Err(failure(StatusCode::BAD_REQUEST, "Reset token expired"));
    }
    Ok(Json(json!({ "message": "Password updated" })))
}

async fn update_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> Reply {
    let mut state = state.lock().await;
    let caller = state.caller(&headers)?;
    let account = state
        .accounts
        .iter_mut()
        .find(|account| account.user.id == caller.id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))?;
    if let Some(name) = update.full_name {
        account.user.full_name = Some(name);
    }
    if let Some(national_id) = update.national_id {
        account.profile.national_id = Some(national_id);
    }
    if let Some(birth_date) = update.birth_date {
        account.profile.birth_date = Some(birth_date);
    }
    if let Some(phone) = update.phone_number {
        account.user.phone_number = Some(phone.clone());
        account.profile.phone_number = Some(phone);
    }
    let profile = &account.profile;
    if profile.national_id.is_some() && profile.birth_date.is_some() && profile.phone_number.is_some() {
        account.user.profile_completed = true;
    }
    Ok(Json(json!(account.user)))
}

async fn categories(State(state): State<Shared>) -> Reply {
    Ok(Json(json!(state.lock().await.categories)))
}

async fn create_complaint(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<CreateComplaintRequest>,
) -> Reply {
    let mut state = state.lock().await;
    let caller = state.caller_with_role(&headers, &[Role::Citizen])?;
    let id = state.next_id();
    let mut record = complaint(id, caller.id, ComplaintStatus::Pending, 0);
    record.title = Some(request.title);
    record.description = request.description;
    record.category_id = Some(request.category_id);
    record.latitude = Some(request.latitude);
    record.longitude = Some(request.longitude);
    record.is_anonymous = request.is_anonymous;
    state.complaints.insert(id, record.clone());
    Ok(Json(json!(record)))
}

async fn my_complaints(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = state.lock().await;
    let caller = state.caller(&headers)?;
    let mine: Vec<&Complaint> = state
        .complaints
        .values()
        .rev()
        .filter(|complaint| complaint.user_id == Some(caller.id))
        .collect();
    Ok(Json(json!(mine)))
}

#[derive(Deserialize)]
struct FeedParams {
    sort: Option<String>,
}

async fn feed(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<FeedParams>,
) -> Reply {
    let state = state.lock().await;
    state.caller(&headers)?;
    let mut items: Vec<Complaint> = state.complaints.values().rev().cloned().collect();
    if params.sort.as_deref() == Some("popular") {
        items.sort_by(|a, b| b.support_count.cmp(&a.support_count));
    }
    Ok(Json(json!(items)))
}

async fn delete_complaint(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().await;
    state.caller(&headers)?;
    state
        .complaints
        .remove(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Complaint not found"))?;
    Ok(Json(json!({ "message": "deleted" })))
}

async fn uploaded_file_names(multipart: &mut Multipart) -> Vec<String> {
    let mut names = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.jpg").to_string();
        let _ = field.bytes().await;
        names.push(name);
    }
    names
}

async fn upload_complaint_photos(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    let names = uploaded_file_names(&mut multipart).await;
    let mut state = state.lock().await;
    state.caller(&headers)?;
    if state.fail_photo_uploads {
        return Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable"));
    }
    let mut photos = Vec::new();
    for name in names {
        let photo_id = state.next_id();
        photos.push(Photo {
            id: PhotoId(photo_id),
            photo_url: format!("/uploads/complaints/{name}"),
            created_at: None,
            kind: PhotoKind::ComplaintEvidence,
        });
    }
    let complaint = state
        .complaints
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Complaint not found"))?;
    complaint.photos.extend(photos.clone());
    Ok(Json(json!(photos)))
}

async fn complaint_photos(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let state = state.lock().await;
    state.caller(&headers)?;
    if state.fail_photo_listing {
        return Err(failure(StatusCode::INTERNAL_SERVER_ERROR, "Storage unavailable"));
    }
    let complaint = state
        .complaints
        .get(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Complaint not found"))?;
    Ok(Json(json!(complaint.photos)))
}

async fn delete_photo(
    State(state): State<Shared>,
    Path(photo_id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().await;
    state.caller(&headers)?;
    for complaint in state.complaints.values_mut() {
        let before = complaint.photos.len();
        complaint.photos.retain(|photo| photo.id.0 != photo_id);
        if complaint.photos.len() != before {
            return Ok(Json(json!({ "message": "deleted" })));
        }
    }
    Err(failure(StatusCode::NOT_FOUND, "Photo not found"))
}

async fn toggle_support(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().await;
    state.caller(&headers)?;
    if !state.complaints.contains_key(&id) {
        return Err(failure(StatusCode::NOT_FOUND, "Complaint not found"));
    }
    let added = state.supported.insert(id);
    if !added {
        state.supported.remove(&id);
    }
    let complaint = state.complaints.get_mut(&id).expect("complaint exists");
    if added {
        complaint.support_count += 1;
    } else {
        complaint.support_count = complaint.support_count.saturating_sub(1);
    }
    Ok(Json(json!({
        "status": if added { "added" } else { "removed" },
        "support_count": complaint.support_count,
    })))
}

const OFFICE_ROLES: &[Role] = &[Role::Official, Role::Admin];

#[derive(Deserialize)]
struct OfficialParams {
    status: Option<ComplaintStatus>,
}

async fn official_complaints(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<OfficialParams>,
) -> Reply {
    let state = state.lock().await;
    state.caller_with_role(&headers, OFFICE_ROLES)?;
    let items: Vec<&Complaint> = state
        .complaints
        .values()
        .rev()
        .filter(|complaint| params.status.map_or(true, |status| complaint.status == status))
        .collect();
    Ok(Json(json!(items)))
}

async fn official_complaint(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let state = state.lock().await;
    state.caller_with_role(&headers, OFFICE_ROLES)?;
    let complaint = state
        .complaints
        .get(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Complaint not found"))?;
    Ok(Json(json!(complaint)))
}

#[derive(Deserialize)]
struct RejectParams {
    reason: String,
}

async fn reject_complaint(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(params): Query<RejectParams>,
) -> Reply {
    let mut state = state.lock().await;
    state.caller_with_role(&headers, OFFICE_ROLES)?;
    if params.reason.chars().count() < 3 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "detail": [{
                    "loc": ["query", "reason"],
                    "msg": "String should have at least 3 characters"
                }]
            })),
        ));
    }
    let complaint = state
        .complaints
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Complaint not found"))?;
    complaint.status = ComplaintStatus::Rejected;
    complaint.reject_reason = Some(params.reason);
    Ok(Json(json!(complaint)))
}

#[derive(Deserialize)]
struct AssignParams {
    employee_id: i64,
}

async fn assign_complaint(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(params): Query<AssignParams>,
) -> Reply {
    let mut state = state.lock().await;
    state.caller_with_role(&headers, OFFICE_ROLES)?;
    if !state
        .workers
        .iter()
        .any(|worker| worker.user_id.0 == params.employee_id)
    {
        return Err(failure(StatusCode::NOT_FOUND, "Employee not found"));
    }
    if !state.complaints.contains_key(&id) {
        return Err(failure(StatusCode::NOT_FOUND, "Complaint not found"));
    }
    let assignment_id = state.next_id();
    state.assignments.retain(|_, record| record.complaint_id.0 != id);
    state.assignments.insert(
        assignment_id,
        AssignmentRecord {
            id: AssignmentId(assignment_id),
            complaint_id: ComplaintId(id),
            employee_id: UserId(params.employee_id),
            status: AssignmentStatus::Assigned,
            solution_urls: Vec::new(),
        },
    );
    let complaint = state.complaints.get_mut(&id).expect("complaint exists");
    complaint.status = ComplaintStatus::Assigned;
    Ok(Json(json!(complaint)))
}

async fn employees(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let state = state.lock().await;
    state.caller_with_role(&headers, OFFICE_ROLES)?;
    Ok(Json(json!(state.workers)))
}

async fn jobs(state: &Shared, headers: &HeaderMap, completed: bool) -> Reply {
    let state = state.lock().await;
    let caller = state.caller_with_role(headers, &[Role::Employee])?;
    let payloads: Vec<AssignmentPayload> = state
        .assignments
        .values()
        .filter(|record| record.employee_id == caller.id)
        .filter(|record| (record.status == AssignmentStatus::Completed) == completed)
        .filter_map(|record| state.assignment_payload(record))
        .collect();
    Ok(Json(json!(payloads)))
}

async fn assigned_jobs(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    jobs(&state, &headers, false).await
}

async fn completed_jobs(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    jobs(&state, &headers, true).await
}

async fn assignment(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let state = state.lock().await;
    state.caller_with_role(&headers, &[Role::Employee])?;
    let payload = state
        .assignments
        .get(&id)
        .and_then(|record| state.assignment_payload(record))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Assignment not found"))?;
    Ok(Json(json!(payload)))
}

async fn start_assignment(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut state = state.lock().await;
    state.caller_with_role(&headers, &[Role::Employee])?;
    let record = state
        .assignments
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Assignment not found"))?;
    if record.status != AssignmentStatus::Assigned {
        return Err(failure(StatusCode::BAD_REQUEST, "Assignment already started"));
    }
    record.status = AssignmentStatus::InProgress;
    let complaint_id = record.complaint_id.0;
    if let Some(complaint) = state.complaints.get_mut(&complaint_id) {
        complaint.status = ComplaintStatus::InProgress;
    }
    Ok(Json(json!({ "status": "started" })))
}

async fn upload_solution_photos(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    let names = uploaded_file_names(&mut multipart).await;
    let mut state = state.lock().await;
    state.caller_with_role(&headers, &[Role::Employee])?;
    let record = state
        .assignments
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Assignment not found"))?;
    record.solution_urls.extend(
        names
            .iter()
            .map(|name| format!("/uploads/solutions/{name}")),
    );
    record.status = AssignmentStatus::Completed;
    let urls = record.solution_urls.clone();
    let complaint_id = record.complaint_id.0;
    if let Some(complaint) = state.complaints.get_mut(&complaint_id) {
        complaint.status = ComplaintStatus::Resolved;
    }
    Ok(Json(json!({
        "solution_photo_urls": urls,
        "assignment_status": "completed",
    })))
}
