//! User Entity
//!
//! A stored account plus the value types used to create, query and change
//! accounts.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    email::Email, login::Login, slug::Slug, user_id::UserId, user_password::UserPassword,
    user_role::UserRole,
};

/// Default and maximum page size for user listings
pub const USER_LIST_MAX_LIMIT: u32 = 100;

/// User entity as persisted
#[derive(Debug, Clone)]
pub struct User {
    /// Store-assigned identifier
    pub id: UserId,
    /// `"{id}-{login}"`, assigned by the store once the id is known
    pub slug: Slug,
    pub login: Login,
    pub email: Email,
    pub password: UserPassword,
    pub role: UserRole,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_administrative(&self) -> bool {
        self.role.is_administrative()
    }

    /// Apply a partial change set
    pub fn apply(&mut self, changes: UserChanges) {
        let UserChanges {
            login,
            email,
            password,
            role,
            activated,
        } = changes;

        if let Some(login) = login {
            self.slug = Slug::for_user(self.id, &login);
            self.login = login;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(password) = password {
            self.password = password;
        }
        if let Some(role) = role {
            self.role = role;
        }
        if let Some(activated) = activated {
            self.activated = activated;
        }
    }
}

/// User not yet persisted (no id, no slug)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: Login,
    pub email: Email,
    pub password: UserPassword,
    pub role: UserRole,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Self-service account: default role, waiting for activation
    pub fn signup(login: Login, email: Email, password: UserPassword) -> Self {
        Self {
            login,
            email,
            password,
            role: UserRole::Default,
            activated: false,
            created_at: Utc::now(),
        }
    }

    /// Attach the store-assigned id
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            slug: Slug::for_user(id, &self.login),
            login: self.login,
            email: self.email,
            password: self.password,
            role: self.role,
            activated: self.activated,
            created_at: self.created_at,
        }
    }
}

/// Validated partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub login: Option<Login>,
    pub email: Option<Email>,
    pub password: Option<UserPassword>,
    pub role: Option<UserRole>,
    pub activated: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.login.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.role.is_none()
            && self.activated.is_none()
    }
}

// ============================================================================
// Listing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    Id,
    Login,
    CreatedAt,
}

impl UserSortField {
    pub fn column(&self) -> &'static str {
        match self {
            UserSortField::Id => "id",
            UserSortField::Login => "login",
            UserSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter for user listings; text filters are case-insensitive substrings
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub ids: Vec<UserId>,
    pub login: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub only_activated: bool,
    pub sort_by: UserSortField,
    pub order: SortOrder,
    pub limit: u32,
    pub offset: u32,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            login: None,
            email: None,
            role: None,
            only_activated: false,
            sort_by: UserSortField::default(),
            order: SortOrder::default(),
            limit: USER_LIST_MAX_LIMIT,
            offset: 0,
        }
    }
}

impl UserFilter {
    /// Clamp the page size into `1..=100`
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, USER_LIST_MAX_LIMIT);
        self
    }

    /// In-process evaluation of the filter (sorting and paging excluded)
    pub fn matches(&self, user: &User) -> bool {
        if !self.ids.is_empty() && !self.ids.contains(&user.id) {
            return false;
        }
        if let Some(login) = &self.login {
            if !user
                .login
                .as_str()
                .to_lowercase()
                .contains(&login.to_lowercase())
            {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if !user.email.as_str().contains(&email.to_lowercase()) {
                return false;
            }
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        !self.only_activated || user.activated
    }
}

/// One page of users plus the number of matches without paging
#[derive(Debug, Clone, Default)]
pub struct UserList {
    pub items: Vec<User>,
    pub total: u64,
}
