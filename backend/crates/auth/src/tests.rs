//! Use case and HTTP tests against the in-memory store and outbox mailer

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use tokio::sync::mpsc;

    use crate::application::{
        AuthConfig, BackgroundTask, BackgroundWorker, SignUpInput, SignUpUseCase, TaskQueue,
    };
    use crate::domain::entity::{
        token::{NewToken, Token, TokenFilter},
        user::{NewUser, User},
    };
    use crate::domain::repository::{TokenRepository, UserRepository};
    use crate::domain::value_object::{
        email::Email,
        login::Login,
        token::{TokenType, TokenValue},
        user_id::UserId,
        user_password::{RawPassword, UserPassword},
        user_role::UserRole,
    };
    use crate::error::AuthResult;
    use crate::infra::{InMemoryAccountsRepository, OutboxEmailSender};

    pub type Repo = InMemoryAccountsRepository;

    pub struct Harness {
        pub repo: Arc<Repo>,
        pub outbox: Arc<OutboxEmailSender>,
        pub queue: TaskQueue,
        pub config: Arc<AuthConfig>,
        worker: BackgroundWorker<Repo, Repo, OutboxEmailSender>,
        rx: mpsc::Receiver<BackgroundTask>,
    }

    impl Harness {
        pub fn new() -> Self {
            let config = Arc::new(AuthConfig::development());
            let repo = Arc::new(InMemoryAccountsRepository::new());
            let outbox = Arc::new(OutboxEmailSender::new());
            let (queue, rx) = TaskQueue::bounded(64);
            let worker = BackgroundWorker::new(
                repo.clone(),
                repo.clone(),
                outbox.clone(),
                config.task_timeout,
            );
            Self {
                repo,
                outbox,
                queue,
                config,
                worker,
                rx,
            }
        }

        /// Run every queued background task to completion
        pub async fn run_background(&mut self) -> usize {
            let mut ran = 0;
            while let Ok(task) = self.rx.try_recv() {
                self.worker.execute(task).await;
                ran += 1;
            }
            ran
        }

        /// Drop queued tasks without running them
        pub fn discard_background(&mut self) {
            while self.rx.try_recv().is_ok() {}
        }

        pub async fn sign_up(&self, login: &str, email: &str, password: &str) -> AuthResult<User> {
            SignUpUseCase::new(
                self.repo.clone(),
                self.repo.clone(),
                self.queue.clone(),
                self.config.clone(),
            )
            .execute(
                None,
                SignUpInput {
                    login: login.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
        }

        /// Stored user that never went through signup (no tokens, no mail)
        pub async fn insert_user(&self, login: &str, role: UserRole, activated: bool) -> User {
            let raw = RawPassword::new("Passw0rd!".to_string()).unwrap();
            let mut new_user = NewUser::signup(
                Login::new(login).unwrap(),
                Email::new(format!("{login}@x.com")).unwrap(),
                UserPassword::from_raw(&raw, None).unwrap(),
            );
            new_user.role = role;
            new_user.activated = activated;
            UserRepository::create(self.repo.as_ref(), &new_user)
                .await
                .unwrap()
        }

        pub async fn insert_token(
            &self,
            kind: TokenType,
            user_id: UserId,
            value: &str,
            created_at: DateTime<Utc>,
        ) -> Token {
            let token = NewToken {
                kind,
                value: TokenValue::from_input(value),
                created_at,
                user_id,
            };
            TokenRepository::create(self.repo.as_ref(), &token)
                .await
                .unwrap()
        }

        pub async fn tokens(&self, kind: TokenType, user_id: UserId) -> Vec<Token> {
            TokenRepository::fetch(self.repo.as_ref(), &TokenFilter::owned(kind, user_id))
                .await
                .unwrap()
        }

        pub async fn user(&self, id: UserId) -> Option<User> {
            UserRepository::find_by_id(self.repo.as_ref(), id)
                .await
                .unwrap()
        }
    }

    /// The plain password inside the reset email
    pub fn emailed_password(html: &str) -> String {
        let start = html.find("<strong>").unwrap() + "<strong>".len();
        let end = html[start..].find("</strong>").unwrap() + start;
        html[start..end].to_string()
    }
}

// ============================================================================
// Signup, activation, login
// ============================================================================

#[cfg(test)]
mod signup_tests {
    use super::support::Harness;
    use crate::application::{LoginInput, LoginUseCase, SignUpInput, SignUpUseCase};
    use crate::domain::value_object::{token::TokenType, user_id::UserId, user_role::UserRole};
    use crate::error::{AuthError, ValidationError};
    use platform::password::PasswordPolicyError;

    #[tokio::test]
    async fn test_signup_creates_unactivated_user_and_token() {
        let mut h = Harness::new();

        let alice = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap();

        assert_eq!(alice.login.as_str(), "alice");
        assert!(!alice.activated);
        assert_eq!(alice.role, UserRole::Default);
        assert_eq!(alice.slug.as_str(), format!("{}-alice", alice.id));

        let tokens = h.tokens(TokenType::Activation, alice.id).await;
        assert_eq!(tokens.len(), 1);

        assert_eq!(h.run_background().await, 1);
        let sent = h.outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@x.com");
        assert!(sent[0].html_body.contains(&format!(
            "/{}/activate/{}",
            alice.id,
            tokens[0].value.as_str()
        )));
    }

    #[tokio::test]
    async fn test_password_without_uppercase_reports_that_rule() {
        let h = Harness::new();

        let err = h.sign_up("alice", "alice@x.com", "short1").await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::Password(PasswordPolicyError::MissingUppercase))
        ));
        assert_eq!(err.message_key(), "user.passwordPolicyError.uppercase");
    }

    #[tokio::test]
    async fn test_signup_validation_failures() {
        let h = Harness::new();

        let err = h.sign_up("a", "alice@x.com", "Passw0rd!").await.unwrap_err();
        assert_eq!(err.message_key(), "user.loginPolicyError");

        let err = h.sign_up("alice", "not-an-email", "Passw0rd!").await.unwrap_err();
        assert_eq!(err.message_key(), "user.emailPolicyError");

        let err = h.sign_up("alice", "alice@x.com", "PASSW0RD").await.unwrap_err();
        assert_eq!(err.message_key(), "user.passwordPolicyError.lowercase");

        let err = h.sign_up("alice", "alice@x.com", "Password").await.unwrap_err();
        assert_eq!(err.message_key(), "user.passwordPolicyError.digit");
    }

    #[tokio::test]
    async fn test_signup_uniqueness() {
        let h = Harness::new();
        h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap();

        let err = h.sign_up("alice", "other@x.com", "Passw0rd!").await.unwrap_err();
        assert!(matches!(err, AuthError::LoginOccupied));

        let err = h.sign_up("alicja", "ALICE@x.com", "Passw0rd!").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailOccupied));
    }

    #[tokio::test]
    async fn test_signup_store_failure_is_generic() {
        let h = Harness::new();
        h.repo.set_fail_writes(true);

        let err = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap_err();

        assert!(matches!(err, AuthError::UserCannotBeCreated(_)));
        assert!(err.kind().is_server_error());
    }

    #[tokio::test]
    async fn test_signup_keeps_user_when_token_insert_fails() {
        let mut h = Harness::new();
        h.repo.set_fail_token_writes(true);

        let err = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap_err();

        assert!(matches!(err, AuthError::ActivationTokenCannotBeCreated(_)));
        assert!(err.kind().is_server_error());
        let alice = h.user(UserId::new(1)).await.unwrap();
        assert_eq!(alice.login.as_str(), "alice");
        assert!(!alice.activated);
        assert!(h.tokens(TokenType::Activation, alice.id).await.is_empty());
        assert_eq!(h.run_background().await, 0);
        assert!(h.outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_logged_in_preconditions() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;

        let err = SignUpUseCase::new(
            h.repo.clone(),
            h.repo.clone(),
            h.queue.clone(),
            h.config.clone(),
        )
        .execute(
            Some(&alice),
            SignUpInput {
                login: "bob".into(),
                email: "bob@x.com".into(),
                password: "Passw0rd!".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::CannotCreateAccountWhileLoggedIn));

        let err = LoginUseCase::new(h.repo.clone())
            .execute(
                Some(&alice),
                LoginInput {
                    login: "alice".into(),
                    password: "Passw0rd!".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CannotLoginWhileLoggedIn));
    }
}

#[cfg(test)]
mod activation_tests {
    use super::support::Harness;
    use crate::application::{ActivateUseCase, GenerateActivationTokenUseCase};
    use crate::domain::value_object::{
        token::{TokenType, TokenValue},
        user_id::UserId,
        user_role::UserRole,
    };
    use crate::error::AuthError;
    use chrono::{TimeDelta, Utc};

    fn activate(h: &Harness) -> ActivateUseCase<super::support::Repo, super::support::Repo> {
        ActivateUseCase::new(h.repo.clone(), h.repo.clone(), h.queue.clone())
    }

    fn generate(
        h: &Harness,
    ) -> GenerateActivationTokenUseCase<super::support::Repo, super::support::Repo> {
        GenerateActivationTokenUseCase::new(
            h.repo.clone(),
            h.repo.clone(),
            h.queue.clone(),
            h.config.clone(),
        )
    }

    #[tokio::test]
    async fn test_activation_succeeds_once() {
        let mut h = Harness::new();
        let alice = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap();
        let token = h.tokens(TokenType::Activation, alice.id).await.remove(0);

        let activated = activate(&h)
            .execute(alice.id, token.value.clone())
            .await
            .unwrap();
        assert!(activated.activated);

        // Still rejected even with the same, valid token
        let err = activate(&h)
            .execute(alice.id, token.value.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountHasBeenActivated));

        h.run_background().await;
        assert!(h.tokens(TokenType::Activation, alice.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_token_of_another_user_is_rejected() {
        let h = Harness::new();
        let alice = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap();
        let bob = h.sign_up("bob", "bob@x.com", "Passw0rd!").await.unwrap();
        let bobs_token = h.tokens(TokenType::Activation, bob.id).await.remove(0);

        let err = activate(&h)
            .execute(alice.id, bobs_token.value.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidActivationToken));
        assert!(!h.user(alice.id).await.unwrap().activated);
    }

    #[tokio::test]
    async fn test_same_value_is_scoped_by_owner_and_kind() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        let bob = h.insert_user("bob", UserRole::Default, false).await;
        h.insert_token(TokenType::Activation, alice.id, "shared", Utc::now()).await;
        h.insert_token(TokenType::ResetPassword, bob.id, "shared", Utc::now()).await;

        let err = activate(&h)
            .execute(bob.id, TokenValue::from_input("shared"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidActivationToken));

        let user = activate(&h)
            .execute(alice.id, TokenValue::from_input("shared"))
            .await
            .unwrap();
        assert!(user.activated);
    }

    #[tokio::test]
    async fn test_activation_of_unknown_user() {
        let h = Harness::new();
        let err = activate(&h)
            .execute(UserId::new(99), TokenValue::from_input("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn test_activation_store_failure() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(TokenType::Activation, alice.id, "tok", Utc::now()).await;
        h.repo.set_fail_writes(true);

        let err = activate(&h)
            .execute(alice.id, TokenValue::from_input("tok"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountCannotBeActivated(_)));
    }

    #[tokio::test]
    async fn test_throttle_rejects_within_interval() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(
            TokenType::Activation,
            alice.id,
            "old",
            Utc::now() - TimeDelta::minutes(9),
        )
        .await;

        let err = generate(&h).execute(alice.id).await.unwrap_err();

        match err {
            AuthError::ReachedLimitOfActivationTokens { retry_after_secs } => {
                assert!((59..=60).contains(&retry_after_secs), "{retry_after_secs}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(h.tokens(TokenType::Activation, alice.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_throttle_allows_after_interval() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(
            TokenType::Activation,
            alice.id,
            "old",
            Utc::now() - TimeDelta::minutes(10),
        )
        .await;

        generate(&h).execute(alice.id).await.unwrap();

        assert_eq!(h.tokens(TokenType::Activation, alice.id).await.len(), 2);
        h.run_background().await;
        assert_eq!(h.outbox.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_throttle_is_per_kind() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(TokenType::ResetPassword, alice.id, "reset", Utc::now()).await;

        assert!(generate(&h).execute(alice.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_activated_account_gets_no_new_token() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;

        let err = generate(&h).execute(alice.id).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountHasBeenActivated));
    }

    #[tokio::test]
    async fn test_current_user_variant_requires_login() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;

        let err = generate(&h).execute_for_current(None).await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));

        assert!(generate(&h).execute_for_current(Some(&alice)).await.is_ok());
    }
}

#[cfg(test)]
mod login_tests {
    use super::support::Harness;
    use crate::application::{LoginInput, LoginUseCase, LogoutUseCase, StartSessionUseCase};
    use crate::domain::repository::SessionStore;
    use crate::domain::value_object::user_role::UserRole;
    use crate::error::AuthError;

    fn input(login: &str, password: &str) -> LoginInput {
        LoginInput {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_with_valid_credentials() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;

        let user = LoginUseCase::new(h.repo.clone())
            .execute(None, input("alice", "Passw0rd!"))
            .await
            .unwrap();
        assert_eq!(user.id, alice.id);
    }

    #[tokio::test]
    async fn test_unknown_login_and_wrong_password_look_the_same() {
        let h = Harness::new();
        h.insert_user("alice", UserRole::Default, true).await;
        let use_case = LoginUseCase::new(h.repo.clone());

        let unknown = use_case
            .execute(None, input("nobody", "Passw0rd!"))
            .await
            .unwrap_err();
        let wrong = use_case
            .execute(None, input("alice", "Wr0ngPassword"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.message_key(), wrong.message_key());
        assert_eq!(unknown.kind(), wrong.kind());
    }

    #[tokio::test]
    async fn test_logout_requires_login_and_drops_session() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;
        let session = StartSessionUseCase::new(h.repo.clone(), h.config.clone())
            .execute(&alice)
            .await
            .unwrap();
        let logout = LogoutUseCase::new(h.repo.clone());

        let err = logout.execute(None, Some(&session.id)).await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));
        assert!(h.repo.find(&session.id).await.unwrap().is_some());

        logout.execute(Some(&alice), Some(&session.id)).await.unwrap();
        assert!(h.repo.find(&session.id).await.unwrap().is_none());
    }
}

// ============================================================================
// Password reset
// ============================================================================

#[cfg(test)]
mod reset_password_tests {
    use super::support::{Harness, Repo, emailed_password};
    use crate::application::{
        ActivateUseCase, GenerateResetPasswordTokenUseCase, LoginInput, LoginUseCase,
        ResetPasswordUseCase, StartSessionUseCase,
    };
    use crate::domain::repository::SessionStore;
    use crate::domain::value_object::{
        token::{TokenType, TokenValue},
        user_role::UserRole,
    };
    use crate::error::AuthError;
    use chrono::{TimeDelta, Utc};

    fn request_token(h: &Harness) -> GenerateResetPasswordTokenUseCase<Repo, Repo> {
        GenerateResetPasswordTokenUseCase::new(
            h.repo.clone(),
            h.repo.clone(),
            h.queue.clone(),
            h.config.clone(),
        )
    }

    fn reset(h: &Harness) -> ResetPasswordUseCase<Repo, Repo> {
        ResetPasswordUseCase::new(
            h.repo.clone(),
            h.repo.clone(),
            h.queue.clone(),
            h.config.clone(),
        )
    }

    async fn login(h: &Harness, login: &str, password: &str) -> Result<(), AuthError> {
        LoginUseCase::new(h.repo.clone())
            .execute(
                None,
                LoginInput {
                    login: login.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .map(|_| ())
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let mut h = Harness::new();
        let alice = h.sign_up("alice", "alice@x.com", "Passw0rd!").await.unwrap();
        let activation = h.tokens(TokenType::Activation, alice.id).await.remove(0);
        ActivateUseCase::new(h.repo.clone(), h.repo.clone(), h.queue.clone())
            .execute(alice.id, activation.value)
            .await
            .unwrap();
        h.run_background().await;

        request_token(&h).execute("Alice@X.com").await.unwrap();
        let token = h.tokens(TokenType::ResetPassword, alice.id).await.remove(0);
        h.run_background().await;
        assert!(
            h.outbox.sent()[1]
                .html_body
                .contains(&format!("/{}/reset-password/{}", alice.id, token.value.as_str()))
        );

        reset(&h).execute(alice.id, token.value.clone()).await.unwrap();
        assert_eq!(h.run_background().await, 3);

        let sent = h.outbox.sent();
        let new_password = emailed_password(&sent[2].html_body);
        assert_eq!(new_password.len(), 32);

        assert!(matches!(
            login(&h, "alice", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        ));
        login(&h, "alice", &new_password).await.unwrap();

        // The consumed token is gone
        assert!(h.tokens(TokenType::ResetPassword, alice.id).await.is_empty());
        let err = reset(&h).execute(alice.id, token.value).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetPasswordToken));
    }

    #[tokio::test]
    async fn test_reset_invalidates_only_owner_sessions() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;
        let bob = h.insert_user("bob", UserRole::Default, true).await;
        let sessions = StartSessionUseCase::new(h.repo.clone(), h.config.clone());
        sessions.execute(&alice).await.unwrap();
        sessions.execute(&alice).await.unwrap();
        let bobs = sessions.execute(&bob).await.unwrap();
        h.insert_token(TokenType::ResetPassword, alice.id, "reset", Utc::now()).await;

        reset(&h)
            .execute(alice.id, TokenValue::from_input("reset"))
            .await
            .unwrap();
        h.run_background().await;

        let remaining = h.repo.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, bobs.id);
    }

    #[tokio::test]
    async fn test_expired_reset_token() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;
        h.insert_token(
            TokenType::ResetPassword,
            alice.id,
            "old",
            Utc::now() - TimeDelta::minutes(61),
        )
        .await;

        let err = reset(&h)
            .execute(alice.id, TokenValue::from_input("old"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
        login(&h, "alice", "Passw0rd!").await.unwrap();
    }

    #[tokio::test]
    async fn test_activation_token_cannot_reset_password() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(TokenType::Activation, alice.id, "act", Utc::now()).await;

        let err = reset(&h)
            .execute(alice.id, TokenValue::from_input("act"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetPasswordToken));
    }

    #[tokio::test]
    async fn test_reset_token_request_rules() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;

        let err = request_token(&h).execute("nobody@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));

        request_token(&h).execute("alice@x.com").await.unwrap();
        let err = request_token(&h).execute("alice@x.com").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::ReachedLimitOfResetPasswordTokens { .. }
        ));
        assert_eq!(err.retry_after_secs(), Some(600));

        h.discard_background();
        assert_eq!(h.tokens(TokenType::ResetPassword, alice.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_email_is_an_unknown_user() {
        let mut h = Harness::new();

        let err = request_token(&h).execute("not-an-email").await.unwrap_err();

        assert!(matches!(err, AuthError::UserNotFound));
        assert_eq!(h.run_background().await, 0);
    }

    #[tokio::test]
    async fn test_reset_token_insert_failure() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;
        h.repo.set_fail_token_writes(true);

        let err = request_token(&h).execute("alice@x.com").await.unwrap_err();

        assert!(matches!(err, AuthError::ResetPasswordTokenCannotBeCreated(_)));
        assert!(err.kind().is_server_error());
        assert_eq!(h.run_background().await, 0);
        h.repo.set_fail_token_writes(false);
        assert!(h.tokens(TokenType::ResetPassword, alice.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_password_update_keeps_old_password() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;
        StartSessionUseCase::new(h.repo.clone(), h.config.clone())
            .execute(&alice)
            .await
            .unwrap();
        h.insert_token(TokenType::ResetPassword, alice.id, "reset", Utc::now()).await;
        h.repo.set_fail_writes(true);

        let err = reset(&h)
            .execute(alice.id, TokenValue::from_input("reset"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::UserCannotBeUpdated(_)));
        assert_eq!(h.run_background().await, 0);
        h.repo.set_fail_writes(false);
        login(&h, "alice", "Passw0rd!").await.unwrap();
        assert_eq!(h.tokens(TokenType::ResetPassword, alice.id).await.len(), 1);
        assert_eq!(h.repo.get_all().await.unwrap().len(), 1);
    }
}

// ============================================================================
// User administration
// ============================================================================

#[cfg(test)]
mod manage_users_tests {
    use super::support::{Harness, Repo};
    use crate::application::{
        CreateUserInput, ManageUsersUseCase, StartSessionUseCase, UpdateUserInput,
    };
    use crate::domain::entity::user::UserFilter;
    use crate::domain::repository::SessionStore;
    use crate::domain::value_object::{token::TokenType, user_id::UserId, user_role::UserRole};
    use crate::error::AuthError;
    use chrono::Utc;

    fn users(h: &Harness) -> ManageUsersUseCase<Repo> {
        ManageUsersUseCase::new(h.repo.clone(), h.queue.clone(), h.config.clone())
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let h = Harness::new();
        let regular = h.insert_user("regular", UserRole::Default, true).await;
        let admin = h.insert_user("admin", UserRole::Administrative, true).await;

        let err = users(&h).fetch(None, UserFilter::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::NotLoggedIn));

        let err = users(&h)
            .fetch(Some(&regular), UserFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));

        let list = users(&h)
            .fetch(Some(&admin), UserFilter::default())
            .await
            .unwrap();
        assert_eq!(list.total, 2);
    }

    #[tokio::test]
    async fn test_public_reads() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, true).await;

        assert_eq!(users(&h).get_by_id(alice.id).await.unwrap().id, alice.id);
        assert_eq!(
            users(&h).get_by_slug(alice.slug.as_str()).await.unwrap().id,
            alice.id
        );
        assert!(matches!(
            users(&h).get_by_id(UserId::new(42)).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_with_role() {
        let h = Harness::new();
        let admin = h.insert_user("admin", UserRole::Administrative, true).await;

        let user = users(&h)
            .create(
                Some(&admin),
                CreateUserInput {
                    login: "moderator".into(),
                    email: "mod@x.com".into(),
                    password: "Passw0rd!".into(),
                    role: Some("administrative".into()),
                    activated: Some(true),
                },
            )
            .await
            .unwrap();
        assert!(user.is_administrative());
        assert!(user.activated);

        let err = users(&h)
            .create(
                Some(&admin),
                CreateUserInput {
                    login: "other".into(),
                    email: "other@x.com".into(),
                    password: "Passw0rd!".into(),
                    role: Some("root".into()),
                    activated: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "user.invalidUserRoleError");
    }

    #[tokio::test]
    async fn test_partial_update() {
        let h = Harness::new();
        let admin = h.insert_user("admin", UserRole::Administrative, true).await;
        let alice = h.insert_user("alice", UserRole::Default, false).await;

        let updated = users(&h)
            .update(
                Some(&admin),
                alice.id,
                UpdateUserInput {
                    login: Some("Alicja".into()),
                    activated: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug.as_str(), format!("{}-alicja", alice.id));
        assert!(updated.activated);
        assert_eq!(updated.email, alice.email);
        assert_eq!(updated.password, alice.password);

        let err = users(&h)
            .update(
                Some(&admin),
                alice.id,
                UpdateUserInput {
                    email: Some("admin@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailOccupied));

        let err = users(&h)
            .update(
                Some(&admin),
                alice.id,
                UpdateUserInput {
                    password: Some("weak".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "user.passwordPolicyError.length");
    }

    #[tokio::test]
    async fn test_delete_removes_user_data() {
        let mut h = Harness::new();
        let admin = h.insert_user("admin", UserRole::Administrative, true).await;
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(TokenType::Activation, alice.id, "a", Utc::now()).await;
        h.insert_token(TokenType::ResetPassword, alice.id, "r", Utc::now()).await;
        let session = StartSessionUseCase::new(h.repo.clone(), h.config.clone())
            .execute(&alice)
            .await
            .unwrap();

        let err = users(&h)
            .delete(Some(&admin), &[alice.id, admin.id])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CannotDeleteOwnAccount));

        let deleted = users(&h)
            .delete(Some(&admin), &[alice.id, UserId::new(99)])
            .await
            .unwrap();
        assert_eq!(deleted.len(), 1);
        h.run_background().await;

        assert!(h.user(alice.id).await.is_none());
        assert!(h.tokens(TokenType::Activation, alice.id).await.is_empty());
        assert!(h.tokens(TokenType::ResetPassword, alice.id).await.is_empty());
        assert!(h.repo.find(&session.id).await.unwrap().is_none());
    }
}

// ============================================================================
// Background work
// ============================================================================

#[cfg(test)]
mod background_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::support::Harness;
    use crate::application::{
        BackgroundTask, BackgroundWorker, SweepSummary, TaskQueue, TokenSweeper,
    };
    use crate::domain::entity::session::Session;
    use crate::domain::repository::SessionStore;
    use crate::domain::service::EmailMessage;
    use crate::domain::value_object::{token::TokenType, user_role::UserRole};
    use crate::infra::{InMemoryAccountsRepository, OutboxEmailSender};
    use chrono::{TimeDelta, Utc};

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "s".to_string(),
            html_body: "b".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_tasks() {
        let (queue, _rx) = TaskQueue::bounded(1);
        assert!(queue.dispatch(BackgroundTask::SendEmail(message("a@x.com"))));
        assert!(!queue.dispatch(BackgroundTask::SendEmail(message("b@x.com"))));
    }

    #[tokio::test]
    async fn test_shutdown_drains_buffered_tasks() {
        let repo = Arc::new(InMemoryAccountsRepository::new());
        let outbox = Arc::new(OutboxEmailSender::new());
        let (queue, rx) = TaskQueue::bounded(16);
        for i in 0..5 {
            assert!(queue.dispatch(BackgroundTask::SendEmail(message(&format!("{i}@x.com")))));
        }

        let handle =
            BackgroundWorker::new(repo.clone(), repo, outbox.clone(), Duration::from_secs(5))
                .spawn(rx);
        handle.shutdown().await;

        assert_eq!(outbox.sent().len(), 5);
        assert!(!queue.dispatch(BackgroundTask::SendEmail(message("late@x.com"))));
    }

    #[tokio::test]
    async fn test_failed_email_does_not_stop_other_tasks() {
        let mut h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        h.insert_token(TokenType::Activation, alice.id, "a", Utc::now()).await;
        h.outbox.set_fail(true);

        h.queue.dispatch(BackgroundTask::SendEmail(message("alice@x.com")));
        h.queue.dispatch(BackgroundTask::DeleteUserTokens {
            kind: TokenType::Activation,
            user_id: alice.id,
        });
        assert_eq!(h.run_background().await, 2);

        assert!(h.outbox.sent().is_empty());
        assert!(h.tokens(TokenType::Activation, alice.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_removes_only_stale_tokens_and_sessions() {
        let h = Harness::new();
        let alice = h.insert_user("alice", UserRole::Default, false).await;
        let now = Utc::now();
        let hours = TimeDelta::hours;
        let minutes = TimeDelta::minutes;
        h.insert_token(TokenType::Activation, alice.id, "a-old", now - hours(25)).await;
        h.insert_token(TokenType::Activation, alice.id, "a-new", now - hours(23)).await;
        h.insert_token(TokenType::ResetPassword, alice.id, "r-old", now - minutes(61)).await;
        h.insert_token(TokenType::ResetPassword, alice.id, "r-new", now - minutes(59)).await;

        let live = Session::for_user(alice.id, TimeDelta::days(1));
        let mut stale = Session::for_user(alice.id, TimeDelta::days(1));
        stale.expires_at = now - TimeDelta::days(30);
        h.repo.save(&live).await.unwrap();
        h.repo.save(&stale).await.unwrap();

        let summary = TokenSweeper::new(h.repo.clone(), h.repo.clone(), h.config.clone())
            .sweep()
            .await
            .unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                tokens: 2,
                sessions: 1
            }
        );
        let activation = h.tokens(TokenType::Activation, alice.id).await;
        assert_eq!(activation.len(), 1);
        assert_eq!(activation[0].value.as_str(), "a-new");
        let reset = h.tokens(TokenType::ResetPassword, alice.id).await;
        assert_eq!(reset.len(), 1);
        assert_eq!(reset[0].value.as_str(), "r-new");
        let sessions = h.repo.get_all().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, live.id);

        // Nothing left to remove on the next pass
        let again = TokenSweeper::new(h.repo.clone(), h.repo.clone(), h.config.clone())
            .sweep()
            .await
            .unwrap();
        assert_eq!(again, SweepSummary::default());
    }
}

// ============================================================================
// HTTP surface
// ============================================================================

#[cfg(test)]
mod router_tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::application::{AuthConfig, BackgroundTask, TaskQueue};
    use crate::infra::InMemoryAccountsRepository;
    use crate::presentation::accounts_router;

    fn app() -> (Router, mpsc::Receiver<BackgroundTask>) {
        let (queue, rx) = TaskQueue::bounded(64);
        let router = accounts_router(
            Arc::new(InMemoryAccountsRepository::new()),
            queue,
            Arc::new(AuthConfig::development()),
        );
        (router, rx)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_sets_session_cookie() {
        let (app, _rx) = app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                json!({"login": "alice", "email": "alice@x.com", "password": "Passw0rd!"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("session_id="));
        let body = body_json(response).await;
        assert_eq!(body["login"], "alice");
        assert_eq!(body["activated"], false);

        let response = app
            .oneshot(
                Request::get("/auth/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["email"], "alice@x.com");
    }

    #[tokio::test]
    async fn test_errors_are_localized() {
        let (app, _rx) = app();

        let response = app
            .clone()
            .oneshot(Request::get("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["code"], "auth.mustBeLoggedInError");
        assert_eq!(body["detail"], "You must be logged in.");

        let response = app
            .oneshot(
                Request::get("/users")
                    .header(header::ACCEPT_LANGUAGE, "pl-PL,pl;q=0.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["detail"], "Musisz być zalogowany.");
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (app, _rx) = app();

        let response = app
            .oneshot(post_json("/auth/login", json!({"login": "alice"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "global.invalidPayloadError");
    }

    #[tokio::test]
    async fn test_anonymous_me_and_health() {
        let (app, _rx) = app();

        let response = app
            .clone()
            .oneshot(Request::get("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, Value::Null);

        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
