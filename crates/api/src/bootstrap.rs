//! First-run operator account.
//!
//! There is no sign-up endpoint. On an empty `users` table the server creates
//! one operator from `ADMIN_EMAIL` / `ADMIN_PASSWORD` so somebody can log in.

use cadence_core::error::CoreError;
use cadence_db::models::user::{CreateUser, User};
use cadence_db::repositories::UserRepo;
use sqlx::PgPool;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};

/// Minimum length of the bootstrap password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Credentials of the operator created on first run.
#[derive(Clone)]
pub struct BootstrapAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAccount")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BootstrapAccount {
    /// Read `ADMIN_EMAIL`, `ADMIN_PASSWORD` and optional `ADMIN_NAME`.
    ///
    /// Returns `None` unless both email and password are set.
    pub fn from_env() -> Option<Self> {
        let email = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty())?;
        let password = std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty())?;
        let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".into());
        Some(Self {
            email,
            password,
            name,
        })
    }
}

/// Create `account` if no user exists yet. Returns the created user.
pub async fn ensure_operator(
    pool: &PgPool,
    account: &BootstrapAccount,
    hash_cost: u32,
) -> AppResult<Option<User>> {
    if UserRepo::count(pool).await? > 0 {
        return Ok(None);
    }
    if account.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Core(CoreError::Validation(format!(
            "ADMIN_PASSWORD must be at least {MIN_PASSWORD_LENGTH} characters long"
        ))));
    }

    let password_hash = hash_password(&account.password, hash_cost)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: account.email.clone(),
            name: account.name.clone(),
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Bootstrap operator created");
    Ok(Some(user))
}
