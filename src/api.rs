// 🌐 REST API with Axum
//
// The acting user comes from the `X-User-Id` header. Session and password
// handling live in front of this service.
//
// Record and dashboard routes additionally require the actor to belong to a
// household; household routes are exempt so a household-less user can
// create or join one.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error};

use crate::actions::{household, records, registration, users, MembershipChange};
use crate::dashboard::{dashboard_for, DashboardSummary, PeriodQuery};
use crate::db;
use crate::entities::{
    Expense, Household, HouseholdId, HouseholdWithMembers, Income, NewUser, Role, User, UserId,
};
use crate::error::AppError;
use crate::ledger::StoredRecord;

pub const USER_HEADER: &str = "x-user-id";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::StatePoisoned)
    }
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: String, data: Option<T>) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(data))))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("a household is required: create or join one first")]
    HouseholdRequired,

    #[error("database lock poisoned")]
    StatePoisoned,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::App(err) => match err {
                AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
                AppError::InvariantViolation(_) => StatusCode::CONFLICT,
                AppError::NotFound { .. } => StatusCode::NOT_FOUND,
                AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AppError::Database(_) | AppError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::HouseholdRequired => StatusCode::CONFLICT,
            ApiError::StatePoisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let data = match &self {
            ApiError::HouseholdRequired => Some(serde_json::json!({ "household_routes": "/api/household" })),
            _ => None,
        };
        (status, Json(ApiResponse::failed(self.to_string(), data))).into_response()
    }
}

// ============================================================================
// Acting user
// ============================================================================

/// Authenticated acting user, freshly loaded for this request
pub struct Actor(pub User);

/// Acting user that belongs to a household
pub struct Member(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id: UserId = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .ok_or(AppError::Unauthenticated)?;

        let conn = state.conn()?;
        let user = db::get_user(&conn, user_id)?.ok_or(AppError::Unauthenticated)?;
        Ok(Actor(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Member {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Actor(user) = Actor::from_request_parts(parts, state).await?;
        if !user.has_household() {
            return Err(ApiError::HouseholdRequired);
        }
        Ok(Member(user))
    }
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct Registration {
    pub user: User,
    pub household: Household,
}

#[derive(Debug, Deserialize)]
pub struct HouseholdNameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(flatten)]
    pub user: NewUser,
    #[serde(default)]
    pub add_to_household: bool,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub household_id: HouseholdId,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/register
async fn register(State(state): State<AppState>, Json(body): Json<NewUser>) -> Created<Registration> {
    let conn = state.conn()?;
    let (user, household) = registration::register_user(&conn, body)?;
    created(Registration { user, household })
}

// --- receitas / despesas ----------------------------------------------------

async fn list_records<R>(State(state): State<AppState>, Member(actor): Member) -> ApiResult<Vec<R>>
where
    R: StoredRecord + Serialize + Send + 'static,
{
    let conn = state.conn()?;
    ok(records::list::<R>(&conn, &actor)?)
}

async fn create_record<R>(
    State(state): State<AppState>,
    Member(actor): Member,
    Json(draft): Json<R::Draft>,
) -> Created<R>
where
    R: StoredRecord + Serialize + Send + 'static,
    R::Draft: DeserializeOwned + Send + 'static,
{
    let conn = state.conn()?;
    created(records::create::<R>(&conn, &actor, draft)?)
}

async fn show_record<R>(
    State(state): State<AppState>,
    Member(actor): Member,
    Path(id): Path<i64>,
) -> ApiResult<R>
where
    R: StoredRecord + Serialize + Send + 'static,
{
    let conn = state.conn()?;
    ok(records::get::<R>(&conn, &actor, id)?)
}

async fn update_record<R>(
    State(state): State<AppState>,
    Member(actor): Member,
    Path(id): Path<i64>,
    Json(draft): Json<R::Draft>,
) -> ApiResult<R>
where
    R: StoredRecord + Serialize + Send + 'static,
    R::Draft: DeserializeOwned + Send + 'static,
{
    let conn = state.conn()?;
    ok(records::update::<R>(&conn, &actor, id, draft)?)
}

async fn delete_record<R>(
    State(state): State<AppState>,
    Member(actor): Member,
    Path(id): Path<i64>,
) -> ApiResult<Deleted>
where
    R: StoredRecord + Serialize + Send + 'static,
{
    let conn = state.conn()?;
    records::delete::<R>(&conn, &actor, id)?;
    ok(Deleted { id })
}

/// GET /api/dashboard?periodo=&data_inicio=&data_fim=
async fn dashboard(
    State(state): State<AppState>,
    Member(actor): Member,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<DashboardSummary> {
    let conn = state.conn()?;
    ok(dashboard_for(&conn, &actor, &query, Utc::now().date_naive())?)
}

// --- household (no household required) --------------------------------------

async fn current_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<Option<HouseholdWithMembers>> {
    let conn = state.conn()?;
    ok(household::current_household(&conn, &actor)?)
}

async fn create_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<HouseholdNameRequest>,
) -> Created<Household> {
    let conn = state.conn()?;
    created(household::create_household(&conn, &actor, &body.name)?)
}

async fn available_households(
    State(state): State<AppState>,
    Actor(_actor): Actor,
) -> ApiResult<Vec<HouseholdWithMembers>> {
    let conn = state.conn()?;
    ok(household::available_households(&conn)?)
}

async fn show_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<HouseholdId>,
) -> ApiResult<HouseholdWithMembers> {
    let conn = state.conn()?;
    ok(household::show_household(&conn, &actor, id)?)
}

async fn rename_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<HouseholdId>,
    Json(body): Json<HouseholdNameRequest>,
) -> ApiResult<Household> {
    let conn = state.conn()?;
    ok(household::rename_household(&conn, &actor, id, &body.name)?)
}

async fn join_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<HouseholdId>,
) -> ApiResult<MembershipChange> {
    let conn = state.conn()?;
    ok(household::join_household(&conn, &actor, id)?)
}

async fn switch_household(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<HouseholdId>,
) -> ApiResult<Household> {
    let conn = state.conn()?;
    ok(household::switch_household(&conn, &actor, id)?)
}

async fn leave_household(State(state): State<AppState>, Actor(actor): Actor) -> ApiResult<MembershipChange> {
    let conn = state.conn()?;
    ok(household::leave_household(&conn, &actor)?)
}

// --- user management ----------------------------------------------------------

async fn list_users(State(state): State<AppState>, Actor(actor): Actor) -> ApiResult<Vec<User>> {
    let conn = state.conn()?;
    ok(users::list_users(&conn, &actor)?)
}

async fn create_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<CreateUserRequest>,
) -> Created<User> {
    let conn = state.conn()?;
    created(users::create_user(&conn, &actor, body.user, body.add_to_household)?)
}

async fn show_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
) -> ApiResult<User> {
    let conn = state.conn()?;
    ok(users::get_user(&conn, &actor, id)?)
}

async fn update_role(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
    Json(body): Json<RoleRequest>,
) -> ApiResult<User> {
    let role: Role = body.role.parse()?;
    let conn = state.conn()?;
    ok(users::update_role(&conn, &actor, id, role)?)
}

async fn delete_user(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
) -> ApiResult<Deleted> {
    let conn = state.conn()?;
    users::delete_user(&conn, &actor, id)?;
    ok(Deleted { id })
}

async fn membership_overview(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> ApiResult<users::MembershipOverview> {
    let conn = state.conn()?;
    ok(users::membership_overview(&conn, &actor)?)
}

async fn add_member(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
) -> ApiResult<MembershipChange> {
    let conn = state.conn()?;
    ok(users::add_to_household(&conn, &actor, id)?)
}

async fn remove_member(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
) -> ApiResult<Deleted> {
    let conn = state.conn()?;
    users::remove_from_household(&conn, &actor, id)?;
    ok(Deleted { id })
}

async fn move_member(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<UserId>,
    Json(body): Json<MoveRequest>,
) -> ApiResult<MembershipChange> {
    let conn = state.conn()?;
    ok(users::move_to_household(&conn, &actor, id, body.household_id)?)
}

// ============================================================================
// Router
// ============================================================================

fn record_routes<R>() -> Router<AppState>
where
    R: StoredRecord + Serialize + Send + 'static,
    R::Draft: DeserializeOwned + Send + 'static,
{
    Router::new()
        .route("/", get(list_records::<R>).post(create_record::<R>))
        .route(
            "/:id",
            get(show_record::<R>)
                .put(update_record::<R>)
                .delete(delete_record::<R>),
        )
}

/// The `/api` surface, with CORS and request tracing
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(register))
        .nest("/receitas", record_routes::<Income>())
        .nest("/despesas", record_routes::<Expense>())
        .route("/dashboard", get(dashboard))
        .route("/household", get(current_household).post(create_household))
        .route("/household/available", get(available_households))
        .route("/household/leave", post(leave_household))
        .route("/household/:id", get(show_household).put(rename_household))
        .route("/household/:id/join", post(join_household))
        .route("/household/:id/switch", post(switch_household))
        .route("/users", get(list_users).post(create_user))
        .route("/users/membership", get(membership_overview))
        .route("/users/:id", get(show_user).delete(delete_user))
        .route("/users/:id/role", patch(update_role))
        .route("/users/:id/household", post(add_member).delete(remove_member))
        .route("/users/:id/move", post(move_member))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
