//! Account emails
//!
//! Every message uses the same minimal HTML layout: a heading and one
//! paragraph. User-controlled text is escaped.

use crate::application::config::AuthConfig;
use crate::domain::entity::user::User;
use crate::domain::service::EmailMessage;
use crate::domain::value_object::token::TokenValue;

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn layout(title: &str, content: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body><h1>{}</h1><p>{}</p></body></html>",
        escape_html(title),
        content
    )
}

fn message(user: &User, subject: String, content: String) -> EmailMessage {
    EmailMessage {
        to: user.email.as_str().to_string(),
        html_body: layout(&subject, &content),
        subject,
    }
}

pub fn activation_email(config: &AuthConfig, user: &User, token: &TokenValue) -> EmailMessage {
    let link = escape_html(&config.activation_link(user.id, token.as_str()));
    message(
        user,
        format!("{} - activate your account", config.app_name),
        format!(
            "Hi {}, click <a href=\"{link}\">{link}</a> to activate your account.",
            escape_html(user.login.as_str())
        ),
    )
}

pub fn reset_password_token_email(
    config: &AuthConfig,
    user: &User,
    token: &TokenValue,
) -> EmailMessage {
    let link = escape_html(&config.reset_password_link(user.id, token.as_str()));
    message(
        user,
        format!("{} - password reset", config.app_name),
        format!(
            "Hi {}, click <a href=\"{link}\">{link}</a> to reset your password. \
             If you did not ask for it, ignore this message.",
            escape_html(user.login.as_str())
        ),
    )
}

/// Carries the generated password in `<strong>` tags
pub fn new_password_email(config: &AuthConfig, user: &User, password: &str) -> EmailMessage {
    message(
        user,
        format!("{} - your new password", config.app_name),
        format!(
            "Hi {}, your new password is <strong>{}</strong>. Change it after logging in.",
            escape_html(user.login.as_str()),
            escape_html(password)
        ),
    )
}
