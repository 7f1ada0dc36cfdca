use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, ProfileResponse, SigninRequest, SignupRequest},
        jwt::AuthUser,
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/protected", get(protected))
}

/// A non-JSON content type or mistyped fields leave the body empty so the field check
/// reports it; a body that fails to parse is a server error.
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection @ JsonRejection::MissingJsonContentType(_))
        | Err(rejection @ JsonRejection::JsonDataError(_)) => {
            warn!(error = %rejection, "request body ignored");
            Ok(T::default())
        }
        Err(rejection) => Err(ApiError::internal("Something broke!", rejection)),
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let req = body_or_default(payload)?;
    let (user, token) = services::signup(state.users.as_ref(), &state.keys, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully",
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = body_or_default(payload)?;
    let (user, token) = services::signin(state.users.as_ref(), &state.keys, req).await?;
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn protected(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = services::profile(state.users.as_ref(), user_id).await?;
    Ok(Json(ProfileResponse {
        message: "Protected route accessed successfully",
        user: user.into(),
    }))
}
