//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing query selects. Every listing is ordered by
/// `pub_date` descending with `id` descending as the tie-break.
#[derive(Debug, Clone)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts authored by any of the given users. An empty set selects nothing.
    AuthorAmong(Vec<Uuid>),
}

#[derive(Debug, Clone)]
pub struct NewPostParams {
    pub text: String,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub group_id: Option<Uuid>,
    /// `None` keeps the stored image; `Some` replaces it.
    pub image_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
    /// All groups ordered by title, for the post form's group selector.
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_page(
        &self,
        filter: &PostFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError>;

    /// Overwrites the stored row in place; the row count never changes.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Deleting a post removes its comments as well.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge if absent. Returns `true` when a new edge was created.
    async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError>;

    /// Delete the edge if present. Returns `true` when an edge was removed.
    async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError>;

    async fn is_following(&self, follower_id: Uuid, following_id: Uuid)
    -> Result<bool, RepoError>;

    /// Users the given follower is subscribed to.
    async fn following_ids(&self, follower_id: Uuid) -> Result<Vec<Uuid>, RepoError>;
}
