//! Token Entity
//!
//! Single-use tokens for account activation and password reset.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::value_object::{
    token::{TokenId, TokenType, TokenValue},
    user_id::UserId,
};

#[derive(Debug, Clone)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenType,
    pub value: TokenValue,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl Token {
    /// A token only validates when kind, value and owner all match
    pub fn matches(&self, kind: TokenType, value: &TokenValue, user_id: UserId) -> bool {
        self.kind == kind && &self.value == value && self.user_id == user_id
    }

    /// Strictly older than `ttl` at `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match (now - self.created_at).to_std() {
            Ok(age) => age > ttl,
            Err(_) => false,
        }
    }
}

/// Token not yet persisted
#[derive(Debug, Clone)]
pub struct NewToken {
    pub kind: TokenType,
    pub value: TokenValue,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl NewToken {
    /// Fresh token with a random value
    pub fn issue(kind: TokenType, user_id: UserId) -> Self {
        Self {
            kind,
            value: TokenValue::generate(),
            created_at: Utc::now(),
            user_id,
        }
    }

    pub fn into_token(self, id: TokenId) -> Token {
        Token {
            id,
            kind: self.kind,
            value: self.value,
            created_at: self.created_at,
            user_id: self.user_id,
        }
    }
}

/// Token query; every `Some` field narrows the result
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    pub kind: Option<TokenType>,
    pub value: Option<TokenValue>,
    pub user_id: Option<UserId>,
    /// Only tokens created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
}

impl TokenFilter {
    /// Exact lookup used to validate a token presented by a client
    pub fn exact(kind: TokenType, value: TokenValue, user_id: UserId) -> Self {
        Self {
            kind: Some(kind),
            value: Some(value),
            user_id: Some(user_id),
            created_before: None,
        }
    }

    /// All tokens of one kind owned by a user
    pub fn owned(kind: TokenType, user_id: UserId) -> Self {
        Self {
            kind: Some(kind),
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Tokens of one kind created before `cutoff`
    pub fn stale(kind: TokenType, cutoff: DateTime<Utc>) -> Self {
        Self {
            kind: Some(kind),
            created_before: Some(cutoff),
            ..Default::default()
        }
    }

    pub fn matches(&self, token: &Token) -> bool {
        self.kind.is_none_or(|kind| token.kind == kind)
            && self.value.as_ref().is_none_or(|value| &token.value == value)
            && self.user_id.is_none_or(|user_id| token.user_id == user_id)
            && self
                .created_before
                .is_none_or(|cutoff| token.created_at < cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn token(user: i64, value: &str) -> Token {
        NewToken {
            kind: TokenType::Activation,
            value: TokenValue::from_input(value),
            created_at: Utc::now(),
            user_id: UserId::new(user),
        }
        .into_token(TokenId::new(1))
    }

    #[test]
    fn test_token_is_scoped_to_owner() {
        let value = TokenValue::from_input("same-value");
        let a = token(1, "same-value");
        let b = token(2, "same-value");

        assert!(a.matches(TokenType::Activation, &value, UserId::new(1)));
        assert!(!a.matches(TokenType::Activation, &value, UserId::new(2)));
        assert!(b.matches(TokenType::Activation, &value, UserId::new(2)));
        assert!(!a.matches(TokenType::ResetPassword, &value, UserId::new(1)));
    }

    #[test]
    fn test_exact_filter_requires_owner() {
        let a = token(1, "v");
        let filter = TokenFilter::exact(
            TokenType::Activation,
            TokenValue::from_input("v"),
            UserId::new(2),
        );
        assert!(!filter.matches(&a));
    }

    #[test]
    fn test_stale_filter_is_strict() {
        let mut t = token(1, "v");
        let cutoff = Utc::now();
        t.created_at = cutoff;
        assert!(!TokenFilter::stale(TokenType::Activation, cutoff).matches(&t));
        t.created_at = cutoff - TimeDelta::seconds(1);
        assert!(TokenFilter::stale(TokenType::Activation, cutoff).matches(&t));
    }

    #[test]
    fn test_expiry() {
        let mut t = token(1, "v");
        let now = Utc::now();
        t.created_at = now - TimeDelta::minutes(61);
        assert!(t.is_expired(Duration::from_secs(3600), now));
        t.created_at = now - TimeDelta::minutes(59);
        assert!(!t.is_expired(Duration::from_secs(3600), now));
    }
}
