use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use crate::validate;
use fitlog_core::metrics::GoalStatus;
use fitlog_core::models::{
    Goal, GoalPatch, Measurement, MeasurementPatch, NewGoal, NewMeasurement, NewWorkout,
    PublicUser, Workout, WorkoutPatch,
};
use fitlog_core::query::{GoalStatusFilter, WorkoutFilter};
use fitlog_core::{Storage, StoreError};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Box<dyn Storage>>>,
}

impl AppState {
    fn new(store: Box<dyn Storage>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Lock for exactly one storage call. Poisoning is ignored.
    fn store(&self) -> MutexGuard<'_, Box<dyn Storage>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Deserialize)]
struct GoalListQuery {
    #[serde(default)]
    status: GoalStatusFilter,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    PayloadTooLarge(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            Self::Internal(err) => {
                error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownUser(_) | StoreError::InstantOutOfRange(_) => {
                Self::BadRequest(err.to_string())
            }
            StoreError::DuplicateUsername(_) => Self::Conflict(err.to_string()),
            StoreError::Unavailable(_) => Self::Internal(err.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn invalid(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- User handlers ---

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .store()
        .get_user(id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}

// --- Workout handlers ---

async fn list_workouts(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    filter: Result<Query<WorkoutFilter>, QueryRejection>,
) -> Result<Json<Vec<Workout>>, ApiError> {
    let Query(filter) = filter?;
    let workouts = state.store().get_workouts(user_id)?;
    Ok(Json(filter.apply(workouts)))
}

async fn get_workout(
    State(state): State<AppState>,
    Path((_user_id, id)): Path<(i64, i64)>,
) -> Result<Json<Workout>, ApiError> {
    let workout = state
        .store()
        .get_workout(id)?
        .ok_or_else(|| ApiError::NotFound("Workout not found".to_string()))?;
    Ok(Json(workout))
}

async fn create_workout(
    State(state): State<AppState>,
    payload: Result<Json<NewWorkout>, JsonRejection>,
) -> Result<(StatusCode, Json<Workout>), ApiError> {
    let Json(new) = payload?;
    validate::new_workout(&new).map_err(|e| invalid(&e))?;

    let workout = state.store().create_workout(&new)?;
    info!(
        id = workout.id,
        user_id = workout.user_id,
        "workout created"
    );
    Ok((StatusCode::CREATED, Json(workout)))
}

async fn update_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<WorkoutPatch>, JsonRejection>,
) -> Result<Json<Workout>, ApiError> {
    let Json(patch) = payload?;
    validate::workout_patch(&patch).map_err(|e| invalid(&e))?;

    let workout = state
        .store()
        .update_workout(id, &patch)?
        .ok_or_else(|| ApiError::NotFound("Workout not found".to_string()))?;
    Ok(Json(workout))
}

async fn delete_workout(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_workout(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Workout not found".to_string()))
    }
}

// --- Measurement handlers ---

async fn list_measurements(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Measurement>>, ApiError> {
    Ok(Json(state.store().get_measurements(user_id)?))
}

async fn latest_measurement(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Measurement>, ApiError> {
    let measurement = state
        .store()
        .get_latest_measurement(user_id)?
        .ok_or_else(|| ApiError::NotFound("No measurements found".to_string()))?;
    Ok(Json(measurement))
}

async fn get_measurement(
    State(state): State<AppState>,
    Path((_user_id, id)): Path<(i64, i64)>,
) -> Result<Json<Measurement>, ApiError> {
    let measurement = state
        .store()
        .get_measurement(id)?
        .ok_or_else(|| ApiError::NotFound("Measurement not found".to_string()))?;
    Ok(Json(measurement))
}

async fn create_measurement(
    State(state): State<AppState>,
    payload: Result<Json<NewMeasurement>, JsonRejection>,
) -> Result<(StatusCode, Json<Measurement>), ApiError> {
    let Json(new) = payload?;
    validate::new_measurement(&new).map_err(|e| invalid(&e))?;

    let measurement = state.store().create_measurement(&new)?;
    info!(
        id = measurement.id,
        user_id = measurement.user_id,
        "measurement created"
    );
    Ok((StatusCode::CREATED, Json(measurement)))
}

async fn update_measurement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<MeasurementPatch>, JsonRejection>,
) -> Result<Json<Measurement>, ApiError> {
    let Json(patch) = payload?;
    validate::measurement_patch(&patch).map_err(|e| invalid(&e))?;

    let measurement = state
        .store()
        .update_measurement(id, &patch)?
        .ok_or_else(|| ApiError::NotFound("Measurement not found".to_string()))?;
    Ok(Json(measurement))
}

async fn delete_measurement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_measurement(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Measurement not found".to_string()))
    }
}

// --- Goal handlers ---

async fn list_goals(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    query: Result<Query<GoalListQuery>, QueryRejection>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    let Query(query) = query?;
    let goals = state.store().get_goals(user_id)?;
    Ok(Json(query.status.apply(goals)))
}

async fn goal_statuses(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    query: Result<Query<GoalListQuery>, QueryRejection>,
) -> Result<Json<Vec<GoalStatus>>, ApiError> {
    let Query(query) = query?;
    let goals = state.store().get_goals(user_id)?;
    let now = Utc::now();
    Ok(Json(
        query
            .status
            .apply(goals)
            .into_iter()
            .map(|g| GoalStatus::new(g, now))
            .collect(),
    ))
}

async fn get_goal(
    State(state): State<AppState>,
    Path((_user_id, id)): Path<(i64, i64)>,
) -> Result<Json<Goal>, ApiError> {
    let goal = state
        .store()
        .get_goal(id)?
        .ok_or_else(|| ApiError::NotFound("Goal not found".to_string()))?;
    Ok(Json(goal))
}

async fn create_goal(
    State(state): State<AppState>,
    payload: Result<Json<NewGoal>, JsonRejection>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let Json(new) = payload?;
    validate::new_goal(&new).map_err(|e| invalid(&e))?;

    let goal = state.store().create_goal(&new)?;
    info!(id = goal.id, user_id = goal.user_id, "goal created");
    Ok((StatusCode::CREATED, Json(goal)))
}

async fn update_goal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<GoalPatch>, JsonRejection>,
) -> Result<Json<Goal>, ApiError> {
    let Json(patch) = payload?;
    validate::goal_patch(&patch).map_err(|e| invalid(&e))?;

    let goal = state
        .store()
        .update_goal(id, &patch)?
        .ok_or_else(|| ApiError::NotFound("Goal not found".to_string()))?;
    Ok(Json(goal))
}

async fn delete_goal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_goal(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Goal not found".to_string()))
    }
}

// The first segment after each collection is a user id for listings and a
// record id for updates and deletes.
fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/user/{id}", get(get_user))
        .route("/api/workouts", post(create_workout))
        .route(
            "/api/workouts/{id}",
            get(list_workouts)
                .put(update_workout)
                .delete(delete_workout),
        )
        .route("/api/workouts/{id}/{record_id}", get(get_workout))
        .route("/api/measurements", post(create_measurement))
        .route(
            "/api/measurements/{id}",
            get(list_measurements)
                .put(update_measurement)
                .delete(delete_measurement),
        )
        .route("/api/measurements/{id}/latest", get(latest_measurement))
        .route("/api/measurements/{id}/{record_id}", get(get_measurement))
        .route("/api/goals", post(create_goal))
        .route(
            "/api/goals/{id}",
            get(list_goals).put(update_goal).delete(delete_goal),
        )
        .route("/api/goals/{id}/status", get(goal_statuses))
        .route("/api/goals/{id}/{record_id}", get(get_goal))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(store: Box<dyn Storage>, port: u16, bind: &str) -> anyhow::Result<()> {
    let app = build_router(AppState::new(store));

    if bind != "127.0.0.1" && bind != "localhost" {
        warn!(
            "Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
