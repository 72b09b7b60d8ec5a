//! Application Layer
//!
//! Use cases and application services.

pub mod activate;
pub mod activation_token;
pub mod background;
pub mod config;
pub mod login;
pub mod manage_users;
pub mod notification;
pub mod reset_password;
pub mod session;
pub mod sign_up;
mod throttle;
pub mod token_sweep;
pub mod viewer;

// Re-exports
pub use activate::ActivateUseCase;
pub use activation_token::GenerateActivationTokenUseCase;
pub use background::{BackgroundTask, BackgroundWorker, TaskQueue, WorkerHandle};
pub use config::AuthConfig;
pub use login::{LoginInput, LoginUseCase};
pub use manage_users::{CreateUserInput, ManageUsersUseCase, UpdateUserInput};
pub use reset_password::{GenerateResetPasswordTokenUseCase, ResetPasswordUseCase};
pub use session::{LogoutUseCase, ResolveViewerUseCase, StartSessionUseCase};
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use token_sweep::{SweepSummary, TokenSweeper};
