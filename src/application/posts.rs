//! Write-side authoring: creating and editing posts, adding comments.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, GroupsRepo, NewCommentParams, NewPostParams, PostsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::drafts::{CommentDraft, FieldErrors, GROUP_UNKNOWN, PostDraft};
use crate::domain::entities::{CommentRecord, PostRecord};

const SOURCE: &str = "application::posts";

#[derive(Debug, Error)]
pub enum ComposeError {
    /// Form input failed validation; nothing was persisted. The carried
    /// field errors are rendered back into the form.
    #[error("submission failed validation")]
    Invalid(FieldErrors),
    #[error("post not found")]
    PostNotFound,
    /// Only the author may edit a post.
    #[error("editor is not the post author")]
    NotAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            comments,
            groups,
        }
    }

    /// Validate the draft and persist a new post. `image_path` is the stored
    /// media path when the form carried an attachment.
    pub async fn create_post(
        &self,
        author_id: Uuid,
        draft: &PostDraft,
        image_path: Option<String>,
    ) -> Result<PostRecord, ComposeError> {
        self.check_draft(draft).await?;

        let record = self
            .posts_write
            .create_post(NewPostParams {
                text: draft.text.clone(),
                author_id,
                group_id: draft.group_id,
                image_path,
            })
            .await?;

        info!(
            target = SOURCE,
            post_id = %record.id,
            author_id = %author_id,
            "post created"
        );
        Ok(record)
    }

    /// Validate the draft and overwrite an existing post in place. Fails
    /// with [`ComposeError::NotAuthor`] for anyone but the post's author.
    pub async fn edit_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
        draft: &PostDraft,
        image_path: Option<String>,
    ) -> Result<PostRecord, ComposeError> {
        let existing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(ComposeError::PostNotFound)?;
        if existing.author_id != editor_id {
            return Err(ComposeError::NotAuthor);
        }

        self.check_draft(draft).await?;

        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text: draft.text.clone(),
                group_id: draft.group_id,
                image_path,
            })
            .await?;

        info!(target = SOURCE, post_id = %record.id, "post updated");
        Ok(record)
    }

    /// Load a post for its edit form; callers pass the viewer for the
    /// author-only check.
    pub async fn editable_post(
        &self,
        post_id: Uuid,
        editor_id: Uuid,
    ) -> Result<PostRecord, ComposeError> {
        let existing = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(ComposeError::PostNotFound)?;
        if existing.author_id != editor_id {
            return Err(ComposeError::NotAuthor);
        }
        Ok(existing)
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        draft: &CommentDraft,
    ) -> Result<CommentRecord, ComposeError> {
        draft.validate().map_err(ComposeError::Invalid)?;

        self.posts
            .find_by_id(post_id)
            .await?
            .ok_or(ComposeError::PostNotFound)?;

        let record = self
            .comments
            .create_comment(NewCommentParams {
                post_id,
                author_id,
                text: draft.text.trim().to_string(),
            })
            .await?;

        info!(
            target = SOURCE,
            post_id = %post_id,
            comment_id = %record.id,
            "comment added"
        );
        Ok(record)
    }

    /// Validate a draft without persisting anything. Handlers run this
    /// before storing a draft's image attachment, so a rejected submission
    /// never leaves a stored file behind.
    pub async fn check_draft(&self, draft: &PostDraft) -> Result<(), ComposeError> {
        let mut errors = match draft.validate() {
            Ok(()) => FieldErrors::default(),
            Err(errors) => errors,
        };

        if let Some(group_id) = draft.group_id
            && self.groups.find_by_id(group_id).await?.is_none()
        {
            errors.group = Some(GROUP_UNKNOWN);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ComposeError::Invalid(errors))
        }
    }
}
