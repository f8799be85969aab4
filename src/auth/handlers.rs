use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, MessageResponse, ProfileResponse, PublicUser, ResetConfirmRequest,
            ResetRequest, SigninRequest, SignupRequest,
        },
        error::AuthError,
        jwt::{AuthUser, JwtKeys},
        password, reset,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signin", post(signin))
        .route("/auth/signup", post(signup))
        .route("/auth/reset-password", post(reset_request))
        .route("/auth/reset-password/:token", post(reset_confirm))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(profile))
}

/// Absent and empty fields are treated alike: both get the 400 prompt.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let (Some(email), Some(password)) = (present(payload.email), present(payload.password)) else {
        return Err(AuthError::MissingField("email and password"));
    };

    let user = match state.users.find_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!("signin unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !password::verify(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "signin invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user signed in");
    Ok(Json(AuthResponse {
        message: "Sign in successful".into(),
        access_token,
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let (Some(email), Some(password)) = (present(payload.email), present(payload.password)) else {
        return Err(AuthError::MissingField("email and password"));
    };

    if state.users.find_by_email(&email).await?.is_some() {
        warn!("signup email already registered");
        return Err(AuthError::AlreadyExists);
    }

    let hash = password::hash(&password)?;
    let user = state.users.create(&email, &hash).await?;
    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".into(),
            access_token,
            user: PublicUser {
                id: user.id,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, AuthError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::NotFound)?;

    Ok(Json(ProfileResponse {
        id: user.id,
        email: user.email,
        created_at: user.created_at,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_request(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(email) = present(payload.email) else {
        return Err(AuthError::MissingField("an email"));
    };

    reset::request_reset(
        state.users.as_ref(),
        state.mailer.as_ref(),
        &state.config.public_base_url,
        &email,
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "Password reset instructions sent if email exists".into(),
    }))
}

#[instrument(skip(state, payload, token))]
pub async fn reset_confirm(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let Some(new_password) = present(payload.password) else {
        return Err(AuthError::MissingField("a new password"));
    };

    reset::consume_reset(state.users.as_ref(), &token, &new_password).await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn body(email: &str, password: &str) -> Json<SignupRequest> {
        Json(SignupRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        })
    }

    fn signin_body(email: &str, password: &str) -> Json<SigninRequest> {
        Json(SigninRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        })
    }

    #[tokio::test]
    async fn signup_then_signin_roundtrip() {
        let state = AppState::fake();

        let (status, Json(created)) = signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.message, "User created successfully");
        assert_eq!(created.user.email, "a@x.com");

        let Json(signed_in) = signin(State(state.clone()), signin_body("a@x.com", "p1"))
            .await
            .expect("signin");
        assert_eq!(signed_in.message, "Sign in successful");
        assert_eq!(signed_in.user.id, created.user.id);

        // The bearer token is usable: it verifies and carries the identity.
        let claims = JwtKeys::from_ref(&state)
            .verify(&signed_in.access_token)
            .expect("token should verify");
        assert_eq!(claims.sub, created.user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let state = AppState::fake();
        signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");

        let wrong_password = signin(State(state.clone()), signin_body("a@x.com", "nope"))
            .await
            .unwrap_err();
        let unknown_email = signin(State(state.clone()), signin_body("ghost@x.com", "p1"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.status(), unknown_email.status());
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn duplicate_signup_is_rejected() {
        let state = AppState::fake();
        signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");

        let err = signup(State(state.clone()), body("a@x.com", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_fields_get_the_400_prompt() {
        let state = AppState::fake();

        let err = signup(
            State(state.clone()),
            Json(SignupRequest {
                email: Some("a@x.com".into()),
                password: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("email and password")));

        let err = signin(
            State(state.clone()),
            Json(SigninRequest {
                email: None,
                password: Some("p1".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("email and password")));

        let err = reset_request(State(state.clone()), Json(ResetRequest { email: None }))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("an email")));

        // Empty strings count as missing, same as the original behavior.
        let err = reset_confirm(
            State(state.clone()),
            Path("sometoken".into()),
            Json(ResetConfirmRequest {
                password: Some(String::new()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("a new password")));
    }

    #[tokio::test]
    async fn reset_request_acknowledges_unknown_emails_identically() {
        let state = AppState::fake();
        signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");

        let Json(known) = reset_request(
            State(state.clone()),
            Json(ResetRequest {
                email: Some("a@x.com".into()),
            }),
        )
        .await
        .expect("known email");
        let Json(unknown) = reset_request(
            State(state.clone()),
            Json(ResetRequest {
                email: Some("ghost@x.com".into()),
            }),
        )
        .await
        .expect("unknown email");

        assert_eq!(known.message, unknown.message);
    }

    #[tokio::test]
    async fn full_reset_scenario_rotates_the_password() {
        let state = AppState::fake();
        signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");
        signin(State(state.clone()), signin_body("a@x.com", "p1"))
            .await
            .expect("signin with original password");

        reset_request(
            State(state.clone()),
            Json(ResetRequest {
                email: Some("a@x.com".into()),
            }),
        )
        .await
        .expect("reset request");

        let token = state
            .users
            .find_by_email("a@x.com")
            .await
            .unwrap()
            .unwrap()
            .reset_token
            .expect("token outstanding");

        let Json(done) = reset_confirm(
            State(state.clone()),
            Path(token),
            Json(ResetConfirmRequest {
                password: Some("p2".into()),
            }),
        )
        .await
        .expect("reset confirm");
        assert_eq!(done.message, "Password updated successfully");

        let err = signin(State(state.clone()), signin_body("a@x.com", "p1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        signin(State(state.clone()), signin_body("a@x.com", "p2"))
            .await
            .expect("signin with new password");
    }

    #[tokio::test]
    async fn reset_confirm_rejects_bad_tokens() {
        let state = AppState::fake();
        let err = reset_confirm(
            State(state.clone()),
            Path("not-a-token".into()),
            Json(ResetConfirmRequest {
                password: Some("p2".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_returns_the_user_or_404() {
        let state = AppState::fake();
        let (_, Json(created)) = signup(State(state.clone()), body("a@x.com", "p1"))
            .await
            .expect("signup");

        let Json(found) = profile(State(state.clone()), AuthUser(created.user.id))
            .await
            .expect("profile");
        assert_eq!(found.id, created.user.id);
        assert_eq!(found.email, "a@x.com");

        let err = profile(State(state.clone()), AuthUser(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound));
    }
}
