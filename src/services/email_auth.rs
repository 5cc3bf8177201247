//! Email access-code auth.
//!
//! DESIGN
//! ======
//! Sign-in is passwordless: the user asks for a short-lived six-character
//! code, we email it, they type it back. Codes are stored hashed and are
//! single use; five wrong guesses burn the active code. Users are created
//! lazily on the first code request, keyed by normalized email.

use rand::Rng;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::services::session::bytes_to_hex;

const CODE_LEN: usize = 6;
// No 0/O/1/I — codes get read off a phone screen and typed by hand.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_FAILED_ATTEMPTS: i32 = 5;
const SIGN_IN_TEMPLATE: &str = include_str!("../../templates/email_auth.html");

#[derive(Debug, thiserror::Error)]
pub enum EmailAuthError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Lowercase and trim an email, rejecting obviously malformed values.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Uppercase a submitted code and check it against the alphabet.
#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN || !normalized.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_access_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[must_use]
pub fn hash_access_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Default display name for a freshly created account.
fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user")
        .to_owned()
}

/// Issue a fresh access code for `email`, creating the user on first
/// contact. Any previously issued, unconsumed code for the address is
/// invalidated.
///
/// # Errors
///
/// Returns `InvalidEmail` for malformed addresses or a database error.
pub async fn request_access_code(pool: &PgPool, email: &str) -> Result<String, EmailAuthError> {
    let normalized = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;
    let name = name_from_email(&normalized);

    sqlx::query(
        r"INSERT INTO users (email, name)
          VALUES ($1, $2)
          ON CONFLICT (email) DO UPDATE SET name = users.name",
    )
    .bind(&normalized)
    .bind(name)
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM email_login_codes WHERE email = $1 AND consumed_at IS NULL")
        .bind(&normalized)
        .execute(pool)
        .await?;

    let code = generate_access_code();
    sqlx::query("INSERT INTO email_login_codes (email, code_hash) VALUES ($1, $2)")
        .bind(&normalized)
        .bind(hash_access_code(&code))
        .execute(pool)
        .await?;

    Ok(code)
}

/// Verify a submitted code and return the user's ID on success.
///
/// A wrong guess increments the attempt counter on the active code and
/// consumes it once `MAX_FAILED_ATTEMPTS` is reached.
///
/// # Errors
///
/// Returns `VerificationFailed` when no live code matches, or the input
/// errors from normalization, or a database error.
pub async fn verify_access_code(pool: &PgPool, email: &str, code: &str) -> Result<Uuid, EmailAuthError> {
    let normalized_email = normalize_email(email).ok_or(EmailAuthError::InvalidEmail)?;
    let normalized_code = normalize_code(code).ok_or(EmailAuthError::InvalidCode)?;
    let code_hash = hash_access_code(&normalized_code);

    let consumed = sqlx::query(
        r"UPDATE email_login_codes
          SET consumed_at = now()
          WHERE id = (
              SELECT id
              FROM email_login_codes
              WHERE email = $1
                AND consumed_at IS NULL
                AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(&normalized_email)
    .bind(&code_hash)
    .fetch_optional(pool)
    .await?;

    if consumed.is_none() {
        sqlx::query(
            r"UPDATE email_login_codes
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id
                  FROM email_login_codes
                  WHERE email = $1
                    AND consumed_at IS NULL
                    AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(&normalized_email)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(pool)
        .await?;
        return Err(EmailAuthError::VerificationFailed);
    }

    let user_row = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&normalized_email)
        .fetch_optional(pool)
        .await?
        .ok_or(EmailAuthError::VerificationFailed)?;

    Ok(user_row.get("id"))
}

/// Deliver the access code via Resend.
///
/// # Errors
///
/// Returns `Delivery` if the provider rejects the send.
pub async fn send_access_code_email(
    api_key: &str,
    from: &str,
    to_email: &str,
    code: &str,
) -> Result<(), EmailAuthError> {
    let resend = Resend::new(api_key);
    let subject = "Your fotomat sign-in code";
    let html = render_sign_in_template(to_email, code);

    let email = CreateEmailBaseOptions::new(from, [to_email], subject).with_html(&html);
    resend
        .emails
        .send(email)
        .await
        .map_err(|e| EmailAuthError::Delivery(e.to_string()))?;
    Ok(())
}

#[must_use]
pub fn render_sign_in_template(email: &str, code: &str) -> String {
    SIGN_IN_TEMPLATE.replace("{{EMAIL}}", email).replace("{{CODE}}", code)
}

#[cfg(test)]
#[path = "email_auth_test.rs"]
mod tests;
