//! Session Entity
//!
//! A server-side session referenced by the session cookie. The owner lives
//! in the free-form `values` map under `"user_id"`, so finding every session
//! of one user means scanning them all.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::value_object::{session_id::SessionId, user_id::UserId};

const USER_ID_KEY: &str = "user_id";

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub values: Map<String, Value>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New session owned by `user_id`
    pub fn for_user(user_id: UserId, ttl: chrono::Duration) -> Self {
        let mut values = Map::new();
        values.insert(USER_ID_KEY.to_string(), Value::from(user_id.get()));
        Self {
            id: SessionId::generate(),
            values,
            expires_at: Utc::now() + ttl,
        }
    }

    /// Owner, if the session carries a well-formed user id
    pub fn user_id(&self) -> Option<UserId> {
        self.values
            .get(USER_ID_KEY)
            .and_then(Value::as_i64)
            .map(UserId::new)
            .filter(UserId::is_assigned)
    }

    pub fn belongs_to(&self, user_id: UserId) -> bool {
        self.user_id() == Some(user_id)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_owner_roundtrip() {
        let session = Session::for_user(UserId::new(12), TimeDelta::hours(1));
        assert_eq!(session.user_id(), Some(UserId::new(12)));
        assert!(session.belongs_to(UserId::new(12)));
        assert!(!session.belongs_to(UserId::new(13)));
    }

    #[test]
    fn test_malformed_owner_is_ignored() {
        let mut session = Session::for_user(UserId::new(12), TimeDelta::hours(1));
        session
            .values
            .insert("user_id".into(), Value::String("12".into()));
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn test_expiry() {
        let session = Session::for_user(UserId::new(1), TimeDelta::minutes(5));
        assert!(!session.is_expired(Utc::now()));
        assert!(session.is_expired(Utc::now() + TimeDelta::minutes(6)));
    }
}
