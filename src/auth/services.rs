use std::time::Duration;

use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{LoginRequest, RegisterRequest},
        repo::UserRepository,
        repo_types::{NewUser, Role, User},
    },
    config::JwtConfig,
    error::AppError,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Hash checked against when the email matches no account.
fn stand_in_hash() -> &'static str {
    lazy_static! {
        static ref STAND_IN_HASH: String =
            hash_password("civicdesk-no-such-account").expect("argon2 default params hash");
    }
    STAND_IN_HASH.as_str()
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
        }
    }

    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            role: user.user_type,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, role = %user.user_type, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

/// Treats absent and blank values the same way.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

/// Passwords are taken verbatim; whitespace counts.
fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

/// Validate a registration request and store the new account.
pub async fn register_user(
    users: &dyn UserRepository,
    payload: RegisterRequest,
) -> Result<User, AppError> {
    let (Some(email), Some(password), Some(name), Some(user_type)) = (
        present(payload.email),
        non_empty(payload.password),
        present(payload.name),
        present(payload.user_type),
    ) else {
        return Err(AppError::validation(
            "Email, password, name, and user type are required",
        ));
    };

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let user_type: Role = user_type.parse().map_err(AppError::Validation)?;

    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&password)?;
    let user = users
        .create(NewUser {
            email,
            name,
            user_type,
            password_hash,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "registration rejected");
            AppError::from(e)
        })?;
    Ok(user)
}

/// Check credentials. Unknown email and wrong password are indistinguishable
/// to the caller.
pub async fn authenticate(
    users: &dyn UserRepository,
    payload: LoginRequest,
) -> Result<User, AppError> {
    let (Some(email), Some(password)) = (present(payload.email), non_empty(payload.password))
    else {
        return Err(AppError::validation("Email and password are required"));
    };

    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    // Unknown emails still pay for one argon2 verification.
    let user = users.find_by_email(&email).await;
    let hash: &str = user
        .as_ref()
        .map_or(stand_in_hash(), |u| u.password_hash.as_str());
    let verified = verify_password(&password, hash)?;

    match user {
        Some(user) if verified => Ok(user),
        Some(user) => {
            warn!(user_id = %user.id, "login invalid password");
            Err(invalid())
        }
        None => {
            warn!(%email, "login unknown email");
            Err(invalid())
        }
    }
}
