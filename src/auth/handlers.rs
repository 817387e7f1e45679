use anyhow::Context;
use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, REGISTER_SUCCESS},
        jwt::{AuthUser, JwtKeys},
        password::{hash_password_blocking, verify_password_blocking},
        repo::StoreError,
        repo_types::{NewUser, User},
    },
    error::{AuthError, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageBody>, AuthError> {
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::EmailExists);
    }

    let password_hash = hash_password_blocking(payload.password, state.config.hash.clone())
        .await
        .context("hash password")?;

    let user = match state
        .users
        .create(NewUser {
            email: payload.email,
            name: payload.name,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::Duplicate) => {
            warn!("email registered concurrently");
            return Err(AuthError::EmailExists);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(MessageBody {
        message: REGISTER_SUCCESS.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let Some(mut user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(AuthError::UserNotFound);
    };

    if !user.verified {
        warn!(user_id = %user.id, "login before verification");
        return Err(AuthError::NotVerified);
    }

    let ok = verify_password_blocking(payload.password, user.password_hash.clone())
        .await
        .context("verify password")?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredential);
    }

    let now = OffsetDateTime::now_utc();
    user.last_login_at = Some(now);
    if state.config.login.await_last_login {
        state
            .users
            .touch_last_login(user.id, now)
            .await
            .context("record last login")?;
    } else {
        // Best-effort: the response does not wait for this write and a failure is only logged.
        let users = state.users.clone();
        let user_id = user.id;
        tokio::spawn(async move {
            if let Err(e) = users.touch_last_login(user_id, now).await {
                warn!(error = %e, %user_id, "failed to record last login");
            }
        });
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign_bearer(user.id, &user.user_type)
        .context("sign jwt")?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse { user, token }))
}

#[instrument(skip(state, auth))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, AuthError> {
    let AuthUser(claims) = auth;
    let user = state
        .users
        .find_by_id(claims.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    Ok(Json(user))
}
