//! Accounts Error Types
//!
//! `AuthError` is the single error type returned by every use case. Each
//! variant knows its `ErrorKind` (status class) and a stable message key used
//! for localization at the HTTP boundary.
//!
//! `StoreError` is what the persistence adapters report. It never reaches a
//! client as-is: use cases translate uniqueness violations into
//! `LoginOccupied`/`EmailOccupied` and everything else into a variant whose
//! localized message is generic.

use kernel::error::kind::ErrorKind;
use platform::password::{PasswordHashError, PasswordPolicyError};
use thiserror::Error;

/// Accounts result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Persistence result type alias
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Store errors
// ============================================================================

/// Column guarded by a unique constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum UniqueField {
    #[display("login")]
    Login,
    #[display("email")]
    Email,
    #[display("slug")]
    Slug,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused the operation (used by the in-memory store)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Validation errors
// ============================================================================

/// A single failed input rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Login must be between {min} and {max} characters")]
    LoginLength { min: usize, max: usize },

    #[error("Invalid email address")]
    Email,

    #[error(transparent)]
    Password(#[from] PasswordPolicyError),

    #[error("Invalid user role")]
    Role,
}

impl ValidationError {
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::LoginLength { .. } => "user.loginPolicyError",
            ValidationError::Email => "user.emailPolicyError",
            ValidationError::Role => "user.invalidUserRoleError",
            ValidationError::Password(rule) => match rule {
                PasswordPolicyError::TooShort { .. } | PasswordPolicyError::TooLong { .. } => {
                    "user.passwordPolicyError.length"
                }
                PasswordPolicyError::MissingUppercase => "user.passwordPolicyError.uppercase",
                PasswordPolicyError::MissingLowercase => "user.passwordPolicyError.lowercase",
                PasswordPolicyError::MissingDigit => "user.passwordPolicyError.digit",
                PasswordPolicyError::InvalidCharacter => "user.passwordPolicyError.characters",
            },
        }
    }
}

// ============================================================================
// Email delivery errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Message could not be built: {0}")]
    Build(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

// ============================================================================
// Use case errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    // --- session preconditions ---
    #[error("Cannot create an account while logged in")]
    CannotCreateAccountWhileLoggedIn,

    #[error("Cannot log in while logged in")]
    CannotLoginWhileLoggedIn,

    #[error("Must be logged in")]
    NotLoggedIn,

    #[error("Insufficient privileges")]
    Unauthorized,

    // --- activation ---
    #[error("Account has already been activated")]
    AccountHasBeenActivated,

    #[error("Invalid activation token")]
    InvalidActivationToken,

    #[error("Account cannot be activated")]
    AccountCannotBeActivated(#[source] StoreError),

    #[error("Activation token cannot be created")]
    ActivationTokenCannotBeCreated(#[source] StoreError),

    #[error("Activation token was generated recently, retry in {retry_after_secs}s")]
    ReachedLimitOfActivationTokens { retry_after_secs: u64 },

    // --- password reset ---
    #[error("Invalid reset password token")]
    InvalidResetPasswordToken,

    #[error("Reset password token cannot be created")]
    ResetPasswordTokenCannotBeCreated(#[source] StoreError),

    #[error("Reset password token was generated recently, retry in {retry_after_secs}s")]
    ReachedLimitOfResetPasswordTokens { retry_after_secs: u64 },

    #[error("Token expired")]
    TokenExpired,

    #[error("Password cannot be generated")]
    CannotGeneratePassword(#[source] PasswordHashError),

    // --- users ---
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Login is already taken")]
    LoginOccupied,

    #[error("Email is already taken")]
    EmailOccupied,

    #[error("User cannot be created")]
    UserCannotBeCreated(#[source] StoreError),

    #[error("User cannot be updated")]
    UserCannotBeUpdated(#[source] StoreError),

    #[error("Cannot delete own account")]
    CannotDeleteOwnAccount,

    // --- input ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // --- infrastructure ---
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        use AuthError::*;
        match self {
            NotLoggedIn | InvalidCredentials => ErrorKind::Unauthorized,
            CannotCreateAccountWhileLoggedIn
            | CannotLoginWhileLoggedIn
            | Unauthorized
            | CannotDeleteOwnAccount => ErrorKind::Forbidden,
            AccountHasBeenActivated | LoginOccupied | EmailOccupied => ErrorKind::Conflict,
            InvalidActivationToken
            | InvalidResetPasswordToken
            | Validation(_)
            | InvalidPayload(_) => ErrorKind::BadRequest,
            UserNotFound => ErrorKind::NotFound,
            TokenExpired => ErrorKind::Gone,
            ReachedLimitOfActivationTokens { .. } | ReachedLimitOfResetPasswordTokens { .. } => {
                ErrorKind::TooManyRequests
            }
            AccountCannotBeActivated(_)
            | ActivationTokenCannotBeCreated(_)
            | ResetPasswordTokenCannotBeCreated(_)
            | CannotGeneratePassword(_)
            | UserCannotBeCreated(_)
            | UserCannotBeUpdated(_)
            | Storage(_) => ErrorKind::InternalServerError,
        }
    }

    /// Stable key identifying the user-facing message
    pub fn message_key(&self) -> &'static str {
        use AuthError::*;
        match self {
            CannotCreateAccountWhileLoggedIn | CannotLoginWhileLoggedIn => {
                "auth.mustBeLoggedOutError"
            }
            NotLoggedIn => "auth.mustBeLoggedInError",
            Unauthorized => "global.unauthorizedError",
            AccountHasBeenActivated => "auth.accountIsActivatedError",
            InvalidActivationToken => "auth.wrongActivationTokenError",
            AccountCannotBeActivated(_) => "auth.accountCannotBeActivatedError",
            ActivationTokenCannotBeCreated(_) => "auth.activationTokenCannotBeCreatedError",
            ReachedLimitOfActivationTokens { .. } => {
                "auth.activationTokenHasBeenGeneratedRecentlyError"
            }
            InvalidResetPasswordToken => "auth.wrongResetPasswordTokenError",
            ResetPasswordTokenCannotBeCreated(_) => "auth.resetPasswordTokenCannotBeCreatedError",
            ReachedLimitOfResetPasswordTokens { .. } => {
                "auth.resetPasswordTokenHasBeenGeneratedRecentlyError"
            }
            TokenExpired => "global.tokenExpiredError",
            CannotGeneratePassword(_) => "auth.cannotGeneratePasswordError",
            UserNotFound => "user.notFoundError",
            InvalidCredentials => "user.invalidCredentialsError",
            LoginOccupied => "user.loginMustBeUniqueError",
            EmailOccupied => "user.emailMustBeUniqueError",
            UserCannotBeCreated(_) => "user.cannotBeCreatedError",
            UserCannotBeUpdated(_) => "user.cannotBeUpdatedError",
            CannotDeleteOwnAccount => "user.cannotDeleteOwnAccountError",
            Validation(rule) => rule.message_key(),
            InvalidPayload(_) => "global.invalidPayloadError",
            Storage(_) => "global.internalServerError",
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AuthError::ReachedLimitOfActivationTokens { retry_after_secs }
            | AuthError::ReachedLimitOfResetPasswordTokens { retry_after_secs } => {
                Some(*retry_after_secs)
            }
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        if self.kind().is_server_error() {
            let source = std::error::Error::source(self)
                .map(|e| e.to_string())
                .unwrap_or_default();
            tracing::error!(error = %self, source = %source, "Accounts request failed");
        } else {
            match self {
                AuthError::InvalidCredentials => {
                    tracing::warn!("Invalid login attempt");
                }
                AuthError::ReachedLimitOfActivationTokens { .. }
                | AuthError::ReachedLimitOfResetPasswordTokens { .. } => {
                    tracing::info!(error = %self, "Token generation throttled");
                }
                _ => {
                    tracing::debug!(error = %self, "Accounts request rejected");
                }
            }
        }
    }

    /// Map a failed insert/update: uniqueness becomes a user-facing conflict
    pub(crate) fn from_unique(err: StoreError, otherwise: fn(StoreError) -> AuthError) -> Self {
        match err {
            StoreError::UniqueViolation(UniqueField::Login)
            | StoreError::UniqueViolation(UniqueField::Slug) => AuthError::LoginOccupied,
            StoreError::UniqueViolation(UniqueField::Email) => AuthError::EmailOccupied,
            other => otherwise(other),
        }
    }
}
