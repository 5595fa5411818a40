//! The follow/unfollow toggle.
//!
//! A follow edge is either absent or present. `follow` moves absent to
//! present, `unfollow` the reverse; both are no-ops from the wrong state,
//! never errors. Duplicate suppression relies on the store's uniqueness
//! constraint, not application locking. Self-follow requests are dropped
//! silently.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const SOURCE: &str = "application::follows";

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
    users: Arc<dyn UsersRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>, users: Arc<dyn UsersRepo>) -> Self {
        Self { follows, users }
    }

    /// Subscribe `follower` to the author named `target`. Idempotent.
    pub async fn follow(
        &self,
        follower: &UserRecord,
        target_username: &str,
    ) -> Result<(), FollowError> {
        let target = self.resolve(target_username).await?;
        if target.id == follower.id {
            debug!(target = SOURCE, user = %follower.username, "self-follow ignored");
            return Ok(());
        }
        let created = self.follows.follow(follower.id, target.id).await?;
        debug!(
            target = SOURCE,
            follower = %follower.username,
            following = %target.username,
            created,
            "follow toggle on"
        );
        Ok(())
    }

    /// Remove the subscription if it exists. Idempotent.
    pub async fn unfollow(
        &self,
        follower: &UserRecord,
        target_username: &str,
    ) -> Result<(), FollowError> {
        let target = self.resolve(target_username).await?;
        if target.id == follower.id {
            return Ok(());
        }
        let removed = self.follows.unfollow(follower.id, target.id).await?;
        debug!(
            target = SOURCE,
            follower = %follower.username,
            following = %target.username,
            removed,
            "follow toggle off"
        );
        Ok(())
    }

    async fn resolve(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(FollowError::UnknownUser)
    }
}
