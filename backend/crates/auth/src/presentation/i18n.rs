//! Error localization
//!
//! Use cases report stable message keys; this module turns them into text
//! in the language the client asked for. Only the HTTP boundary localizes.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    En,
    Pl,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Pl => "pl",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_']).next()?.trim();
        if primary.eq_ignore_ascii_case("en") {
            Some(Language::En)
        } else if primary.eq_ignore_ascii_case("pl") {
            Some(Language::Pl)
        } else {
            None
        }
    }

    /// Highest-weighted supported language of an `Accept-Language` value
    pub fn from_accept_language(value: &str) -> Self {
        let mut best: Option<(Language, f32)> = None;

        for entry in value.split(',') {
            let mut parts = entry.split(';');
            let Some(language) = parts.next().and_then(Language::from_tag) else {
                continue;
            };
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if weight <= 0.0 {
                continue;
            }
            if best.is_none_or(|(_, current)| weight > current) {
                best = Some((language, weight));
            }
        }

        best.map(|(language, _)| language).unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Language
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Language::from_accept_language)
            .unwrap_or_default())
    }
}

/// Compiled-in message catalog
pub struct Localizer;

impl Localizer {
    pub fn translate(language: Language, key: &str) -> &'static str {
        let (en, pl) = match key {
            "auth.mustBeLoggedInError" => ("You must be logged in.", "Musisz być zalogowany."),
            "auth.mustBeLoggedOutError" => ("You must be logged out.", "Musisz być wylogowany."),
            "auth.accountIsActivatedError" => (
                "This account has already been activated.",
                "To konto zostało już aktywowane.",
            ),
            "auth.wrongActivationTokenError" => (
                "The activation token is invalid.",
                "Token aktywacyjny jest nieprawidłowy.",
            ),
            "auth.accountCannotBeActivatedError" => (
                "The account cannot be activated right now.",
                "Nie można teraz aktywować konta.",
            ),
            "auth.activationTokenCannotBeCreatedError" => (
                "An activation token cannot be created right now.",
                "Nie można teraz utworzyć tokenu aktywacyjnego.",
            ),
            "auth.activationTokenHasBeenGeneratedRecentlyError" => (
                "An activation token was generated recently. Try again later.",
                "Token aktywacyjny został niedawno wygenerowany. Spróbuj ponownie później.",
            ),
            "auth.wrongResetPasswordTokenError" => (
                "The password reset token is invalid.",
                "Token resetowania hasła jest nieprawidłowy.",
            ),
            "auth.resetPasswordTokenCannotBeCreatedError" => (
                "A password reset token cannot be created right now.",
                "Nie można teraz utworzyć tokenu resetowania hasła.",
            ),
            "auth.resetPasswordTokenHasBeenGeneratedRecentlyError" => (
                "A password reset token was generated recently. Try again later.",
                "Token resetowania hasła został niedawno wygenerowany. Spróbuj ponownie później.",
            ),
            "auth.cannotGeneratePasswordError" => (
                "A new password cannot be generated right now.",
                "Nie można teraz wygenerować nowego hasła.",
            ),
            "global.unauthorizedError" => (
                "You are not allowed to do this.",
                "Nie masz uprawnień do wykonania tej operacji.",
            ),
            "global.tokenExpiredError" => ("The token has expired.", "Token wygasł."),
            "global.invalidPayloadError" => ("The request is malformed.", "Nieprawidłowe żądanie."),
            "user.notFoundError" => ("User not found.", "Nie znaleziono użytkownika."),
            "user.invalidCredentialsError" => (
                "Invalid login or password.",
                "Nieprawidłowy login lub hasło.",
            ),
            "user.loginMustBeUniqueError" => (
                "This login is already taken.",
                "Ten login jest już zajęty.",
            ),
            "user.emailMustBeUniqueError" => (
                "This email address is already taken.",
                "Ten adres email jest już zajęty.",
            ),
            "user.cannotBeCreatedError" => (
                "The user cannot be created right now.",
                "Nie można teraz utworzyć użytkownika.",
            ),
            "user.cannotBeUpdatedError" => (
                "The user cannot be updated right now.",
                "Nie można teraz zaktualizować użytkownika.",
            ),
            "user.cannotDeleteOwnAccountError" => (
                "You cannot delete your own account.",
                "Nie możesz usunąć własnego konta.",
            ),
            "user.loginPolicyError" => (
                "Login must be between 2 and 128 characters long.",
                "Login musi mieć od 2 do 128 znaków.",
            ),
            "user.emailPolicyError" => ("Invalid email address.", "Nieprawidłowy adres email."),
            "user.invalidUserRoleError" => (
                "Invalid user role.",
                "Nieprawidłowa rola użytkownika.",
            ),
            "user.passwordPolicyError.length" => (
                "Password must be between 6 and 64 characters long.",
                "Hasło musi mieć od 6 do 64 znaków.",
            ),
            "user.passwordPolicyError.uppercase" => (
                "Password must contain at least one uppercase letter.",
                "Hasło musi zawierać co najmniej jedną wielką literę.",
            ),
            "user.passwordPolicyError.lowercase" => (
                "Password must contain at least one lowercase letter.",
                "Hasło musi zawierać co najmniej jedną małą literę.",
            ),
            "user.passwordPolicyError.digit" => (
                "Password must contain at least one digit.",
                "Hasło musi zawierać co najmniej jedną cyfrę.",
            ),
            "user.passwordPolicyError.characters" => (
                "Password contains characters that are not allowed.",
                "Hasło zawiera niedozwolone znaki.",
            ),
            _ => (
                "Something went wrong. Please try again later.",
                "Coś poszło nie tak. Spróbuj ponownie później.",
            ),
        };

        match language {
            Language::En => en,
            Language::Pl => pl,
        }
    }
}

/// `AuthError` paired with the language of the request
#[derive(Debug)]
pub struct LocalizedError {
    pub error: AuthError,
    pub language: Language,
}

impl LocalizedError {
    pub fn new(error: AuthError, language: Language) -> Self {
        Self { error, language }
    }

    pub fn into_app_error(self) -> AppError {
        let key = self.error.message_key();
        let mut app_error = AppError::new(
            self.error.kind(),
            Localizer::translate(self.language, key),
        )
        .with_code(key);
        if let Some(secs) = self.error.retry_after_secs() {
            app_error = app_error.with_retry_after(secs);
        }
        app_error
    }
}

impl IntoResponse for LocalizedError {
    fn into_response(self) -> Response {
        self.error.log();
        self.into_app_error().into_response()
    }
}
