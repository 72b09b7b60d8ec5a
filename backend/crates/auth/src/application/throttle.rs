//! Token generation throttle
//!
//! A user may receive one token of each kind per interval. The newest stored
//! token decides.

use chrono::Utc;
use platform::rate_limit::{IntervalThrottle, ThrottleDecision};

use crate::domain::entity::token::TokenFilter;
use crate::domain::repository::TokenRepository;
use crate::domain::value_object::{token::TokenType, user_id::UserId};
use crate::error::StoreResult;

pub(crate) async fn check_token_throttle<T>(
    token_repo: &T,
    throttle: &IntervalThrottle,
    kind: TokenType,
    user_id: UserId,
) -> StoreResult<ThrottleDecision>
where
    T: TokenRepository,
{
    let newest = token_repo
        .fetch(&TokenFilter::owned(kind, user_id))
        .await?
        .into_iter()
        .map(|token| token.created_at)
        .max();

    Ok(throttle.check(newest, Utc::now()))
}
