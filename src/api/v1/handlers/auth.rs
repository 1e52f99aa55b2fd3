/*
 * Responsibility
 * - POST /auth/register: create a user (educator or learner)
 * - POST /auth/otp: mail a one-time code, throttled per email through the cache
 * - POST /auth/otp/verify: redeem the code for an access token; repeated wrong
 *   codes burn whatever code is live for that email
 *
 * All public (no access middleware).
 */
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::api::v1::dto::auth::{
    OtpRequest, OtpVerifyRequest, RegisterRequest, TokenResponse, UserResponse,
};
use crate::api::v1::extractors::JsonBody;
use crate::api::v1::response::Envelope;
use crate::error::AppError;
use crate::repos::error::RepoError;
use crate::repos::{otp_repo, user_repo};
use crate::services::auth::otp;
use crate::services::notify::OutboundMessage;
use crate::state::AppState;

/// Wrong codes tolerated per email within one OTP lifetime.
const MAX_OTP_FAILURES: u64 = 5;

fn resend_key(email: &str) -> String {
    format!("otp:resend:{}", email)
}

fn failure_key(email: &str) -> String {
    format!("otp:fail:{}", email)
}

async fn record_failure(state: &AppState, email: &str) -> Result<(), AppError> {
    let failures = state
        .cache
        .incr_with_ttl(&failure_key(email), state.otp.ttl)
        .await?;
    if failures >= MAX_OTP_FAILURES {
        let burned = otp_repo::consume(state.store.as_ref(), email).await?;
        state.cache.del(&failure_key(email)).await?;
        tracing::warn!(failures, burned, "otp failure limit reached; codes discarded");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct Registered {
    user: UserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<Envelope<Registered>, AppError> {
    let role = req.validate().map_err(AppError::validation)?;
    let email = otp::normalize_email(&req.email);

    if user_repo::find_by_email(state.store.as_ref(), &email)
        .await?
        .is_some()
    {
        return Err(AppError::validation("email is already registered"));
    }

    let user = user_repo::create(
        state.store.as_ref(),
        req.name.trim(),
        &email,
        role,
        Utc::now(),
    )
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent registration of the same email.
        RepoError::Duplicate(_) => AppError::validation("email is already registered"),
        other => other.into(),
    })?;
    tracing::info!(user_id = %user.id, role = %role, "user registered");

    Ok(Envelope::created(Registered { user: user.into() }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    message: &'static str,
    expires_in: u64,
}

pub async fn request_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<OtpRequest>,
) -> Result<Envelope<OtpSent>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let email = otp::normalize_email(&req.email);

    if user_repo::find_by_email(state.store.as_ref(), &email)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("user"));
    }

    let key = resend_key(&email);
    let fresh = state
        .cache
        .set_if_absent_with_ttl(&key, "1", state.otp.resend_interval)
        .await?;
    if !fresh {
        return Err(AppError::TooManyRequests);
    }

    let now = Utc::now();
    let ttl = chrono::Duration::from_std(state.otp.ttl).map_err(|e| {
        tracing::error!(error = %e, "otp ttl out of range");
        AppError::Internal
    })?;
    let code = otp::generate_code();
    otp_repo::replace(
        state.store.as_ref(),
        &email,
        &otp::hash_code(&email, &code),
        now + ttl,
        now,
    )
    .await?;

    let message = OutboundMessage {
        recipient: email.clone(),
        subject: "Your login code".to_string(),
        body: format!(
            "Your login code is {}. It expires in {} minutes.",
            code,
            state.otp.ttl.as_secs().div_ceil(60)
        ),
    };

    let delivered = match state.notifier.send(&message).await {
        Ok(report) if report.success => true,
        Ok(report) => {
            tracing::error!(details = %report.details, "otp delivery refused");
            false
        }
        Err(err) => {
            tracing::error!(error = %err, "otp delivery failed");
            false
        }
    };

    if !delivered {
        // Let the user retry right away with a new code
        otp_repo::consume(state.store.as_ref(), &email).await?;
        state.cache.del(&key).await?;
        return Err(AppError::Internal);
    }

    tracing::info!(notifier = state.notifier.backend_name(), "otp issued");
    Ok(Envelope::ok(OtpSent {
        message: "code sent",
        expires_in: state.otp.ttl.as_secs(),
    }))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<OtpVerifyRequest>,
) -> Result<Envelope<TokenResponse>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let email = otp::normalize_email(&req.email);
    let code_hash = otp::hash_code(&email, req.code.trim());
    let store = state.store.as_ref();

    let Some(found) = otp_repo::find(store, &email, &code_hash).await? else {
        tracing::warn!("otp verification failed: no matching code");
        record_failure(&state, &email).await?;
        return Err(AppError::InvalidCredential);
    };

    // Consume before checking expiry so an expired code cannot be retried either
    let consumed = otp_repo::consume(store, &email).await?;
    if consumed == 0 {
        tracing::warn!("otp verification raced with another redemption");
        return Err(AppError::InvalidCredential);
    }
    if found.is_expired(Utc::now()) {
        tracing::warn!("otp verification failed: code expired");
        return Err(AppError::InvalidCredential);
    }

    let Some(user) = user_repo::find_by_email(store, &email).await? else {
        return Err(AppError::InvalidCredential);
    };

    let issued = state.tokens.issue(&user.id, user.role).map_err(|e| {
        tracing::error!(error = %e, "token issuing failed");
        AppError::Internal
    })?;

    for key in [resend_key(&email), failure_key(&email)] {
        if let Err(err) = state.cache.del(&key).await {
            tracing::warn!(error = %err, "could not clear otp throttle");
        }
    }

    tracing::info!(user_id = %user.id, "otp login");
    Ok(Envelope::ok(TokenResponse {
        token: issued.token,
        role: user.role,
        expires_in: issued.expires_in,
    }))
}
