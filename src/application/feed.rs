//! Read-side listing queries: the four post feeds.

use std::sync::Arc;

use thiserror::Error;
use time::{OffsetDateTime, macros::format_description};

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::presentation::views::{CommentView, GroupBadge, PostCard, PostDetailView};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown user")]
    UnknownUser,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A group feed together with the group's own descriptive header.
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostCard>,
}

/// An author feed plus the data the profile header renders.
pub struct AuthorFeed {
    pub author: UserRecord,
    pub page: Page<PostCard>,
    pub viewer_is_following: bool,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
    ) -> Self {
        Self {
            posts,
            users,
            groups,
            follows,
            comments,
        }
    }

    /// Every post, newest first.
    pub async fn global(&self, request: PageRequest) -> Result<Page<PostCard>, FeedError> {
        self.page_of(&PostFilter::All, request).await
    }

    /// Posts belonging to the group with the given slug.
    pub async fn group(&self, slug: &str, request: PageRequest) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;
        let page = self.page_of(&PostFilter::Group(group.id), request).await?;
        Ok(GroupFeed { group, page })
    }

    /// Posts written by the given author.
    pub async fn author(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        request: PageRequest,
    ) -> Result<AuthorFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownUser)?;
        let page = self.page_of(&PostFilter::Author(author.id), request).await?;
        let viewer_is_following = match viewer {
            Some(viewer_id) if viewer_id != author.id => {
                self.follows.is_following(viewer_id, author.id).await?
            }
            _ => false,
        };
        Ok(AuthorFeed {
            author,
            page,
            viewer_is_following,
        })
    }

    /// Posts by every author the viewer follows; empty when following nobody.
    pub async fn following(
        &self,
        viewer_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<PostCard>, FeedError> {
        let authors = self.follows.following_ids(viewer_id).await?;
        if authors.is_empty() {
            return Ok(Page::new(Vec::new(), request, 0));
        }
        self.page_of(&PostFilter::AuthorAmong(authors), request).await
    }

    /// A single post with its comments, or `None` for an unknown id.
    pub async fn detail(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<PostDetailView>, FeedError> {
        let Some(record) = self.posts.find_by_id(post_id).await? else {
            return Ok(None);
        };

        let post = self.record_to_card(&record).await?;
        let author_total = self.posts.count(&PostFilter::Author(record.author_id)).await?;

        let mut comments = Vec::new();
        for comment in self.comments.list_for_post(record.id).await? {
            let author = self
                .users
                .find_by_id(comment.author_id)
                .await?
                .ok_or_else(|| RepoError::Integrity {
                    message: format!("comment {} references a missing author", comment.id),
                })?;
            comments.push(CommentView {
                author_username: author.username,
                text: comment.text,
                created: format_pub_date(comment.created_at),
            });
        }

        Ok(Some(PostDetailView {
            viewer_is_author: viewer == Some(record.author_id),
            author_post_total: author_total,
            post,
            comments,
        }))
    }

    async fn page_of(
        &self,
        filter: &PostFilter,
        request: PageRequest,
    ) -> Result<Page<PostCard>, FeedError> {
        let records = self
            .posts
            .list_page(filter, request.limit(), request.offset())
            .await?;
        let total = self.posts.count(filter).await?;

        let mut cards = Vec::with_capacity(records.len());
        for record in &records {
            cards.push(self.record_to_card(record).await?);
        }

        Ok(Page::new(cards, request, total))
    }

    async fn record_to_card(&self, record: &PostRecord) -> Result<PostCard, FeedError> {
        let author = self
            .users
            .find_by_id(record.author_id)
            .await?
            .ok_or_else(|| RepoError::Integrity {
                message: format!("post {} references a missing author", record.id),
            })?;

        let group = match record.group_id {
            Some(group_id) => {
                let group =
                    self.groups
                        .find_by_id(group_id)
                        .await?
                        .ok_or_else(|| RepoError::Integrity {
                            message: format!("post {} references a missing group", record.id),
                        })?;
                Some(GroupBadge {
                    slug: group.slug,
                    title: group.title,
                })
            }
            None => None,
        };

        Ok(PostCard {
            id: record.id,
            text: record.text.clone(),
            preview: record.preview(),
            author_username: author.username,
            group,
            image_url: record.image_path.as_deref().map(media_url),
            published: format_pub_date(record.pub_date),
        })
    }
}

pub(crate) fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

pub(crate) fn format_pub_date(when: OffsetDateTime) -> String {
    let format = format_description!("[day padding:none] [month repr:short] [year]");
    when.format(&format)
        .unwrap_or_else(|_| when.date().to_string())
}
