use base64ct::{Base64UrlUnpadded, Encoding};
use rand::rngs::OsRng;
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use tracing::{error, info};

use crate::auth::error::AuthError;
use crate::auth::password;
use crate::mailer::{reset_email_body, Mailer, RESET_EMAIL_SUBJECT};
use crate::store::{User, UserStore};

/// How long an emailed reset token stays usable.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// 256 bits from the OS RNG, URL-safe base64 without padding (43 chars).
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Start a password reset for `email`.
///
/// The outcome is identical whether or not the address is registered;
/// account existence must not be observable from this call. When a user
/// exists, the token/expiry pair is persisted before the email is attempted,
/// and a delivery failure is logged and swallowed — the token stays valid.
pub async fn request_reset(
    users: &dyn UserStore,
    mailer: &dyn Mailer,
    public_base_url: &str,
    email: &str,
) -> anyhow::Result<()> {
    // Generated up front so the work done does not depend on whether the
    // address is registered.
    let token = generate_reset_token();

    let Some(user) = users.find_by_email(email).await? else {
        return Ok(());
    };

    let expiry = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    users.set_reset_token(user.id, &token, expiry).await?;
    info!(user_id = %user.id, "reset token issued");

    let reset_url = format!(
        "{}/reset-password/{}",
        public_base_url.trim_end_matches('/'),
        token
    );
    if let Err(e) = mailer
        .send(&user.email, RESET_EMAIL_SUBJECT, &reset_email_body(&reset_url))
        .await
    {
        error!(error = %e, user_id = %user.id, "failed to send reset email");
    }

    Ok(())
}

/// Consume a reset token: exact match, unexpired, single-use.
///
/// A missing token and an expired one are indistinguishable to the caller.
/// On success the new password hash is stored and both reset fields are
/// cleared in one guarded write, so a replay or a concurrent consumer loses.
pub async fn consume_reset(
    users: &dyn UserStore,
    token: &str,
    new_password: &str,
) -> Result<User, AuthError> {
    let user = users
        .find_by_reset_token(token)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    let Some(expiry) = user.reset_token_expiry else {
        return Err(AuthError::InvalidOrExpiredToken);
    };
    if OffsetDateTime::now_utc() >= expiry {
        return Err(AuthError::InvalidOrExpiredToken);
    }

    let hash = password::hash(new_password)?;
    let updated = users
        .update_password_and_clear_reset(user.id, token, &hash)
        .await?;
    if !updated {
        return Err(AuthError::InvalidOrExpiredToken);
    }

    info!(user_id = %user.id, "password reset completed");
    Ok(user)
}
