//! Slug Value Object
//!
//! URL-friendly public handle `"{id}-{login}"`. Diacritics are folded to
//! ASCII (`ż` -> `z`, `ł` -> `l`), everything that is not alphanumeric
//! collapses into a single `-`. The id prefix keeps slugs unique.

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::domain::value_object::{login::Login, user_id::UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn for_user(id: UserId, login: &Login) -> Self {
        let mut slug = id.to_string();
        let mut pending_dash = true;

        for ch in login.as_str().nfkd().filter(|c| !is_combining_mark(*c)) {
            let ch = match ch {
                'ł' | 'Ł' => 'l',
                other => other,
            };
            if ch.is_ascii_alphanumeric() {
                if pending_dash {
                    slug.push('-');
                    pending_dash = false;
                }
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }

        Self(slug)
    }

    /// Wrap an incoming slug for lookup or a stored one
    pub fn from_db(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
