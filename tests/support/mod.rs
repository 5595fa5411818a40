#![allow(dead_code)]

use std::sync::{
    Mutex,
    atomic::{AtomicI64, Ordering},
};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use brusio::application::cache::FeedPageCache;
use brusio::application::feed::FeedService;
use brusio::application::follows::FollowService;
use brusio::application::pagination::DEFAULT_PAGE_SIZE;
use brusio::application::posts::PostService;
use brusio::application::repos::{
    CommentsRepo, FollowsRepo, GroupsRepo, NewCommentParams, NewPostParams, PostFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo,
};
use brusio::domain::entities::{CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord};
use brusio::infra::http::{HttpState, SESSION_COOKIE, build_router};
use brusio::infra::media::MediaStorage;
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;
use uuid::Uuid;

/// In-memory repositories backing the router in tests, ordered the same way
/// the Postgres implementations order their queries.
#[derive(Default)]
pub struct MemoryRepositories {
    users: Mutex<Vec<UserRecord>>,
    groups: Mutex<Vec<GroupRecord>>,
    posts: Mutex<Vec<PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    follows: Mutex<Vec<FollowRecord>>,
    clock: AtomicI64,
}

impl MemoryRepositories {
    fn next_timestamp(&self) -> OffsetDateTime {
        let tick = self.clock.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::now_utc() + Duration::seconds(tick)
    }

    pub fn add_user(&self, username: &str) -> UserRecord {
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn add_group(&self, title: &str, slug: &str, description: &str) -> GroupRecord {
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.groups.lock().unwrap().push(group.clone());
        group
    }

    pub fn add_post(
        &self,
        author: &UserRecord,
        group: Option<&GroupRecord>,
        text: &str,
    ) -> PostRecord {
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: text.to_string(),
            author_id: author.id,
            group_id: group.map(|g| g.id),
            image_path: None,
            pub_date: self.next_timestamp(),
        };
        self.posts.lock().unwrap().push(post.clone());
        post
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.lock().unwrap().len()
    }

    pub fn follow_count(&self) -> usize {
        self.follows.lock().unwrap().len()
    }

    pub fn post_by_id(&self, id: Uuid) -> Option<PostRecord> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn latest_post(&self) -> Option<PostRecord> {
        let posts = self.posts.lock().unwrap();
        posts
            .iter()
            .max_by_key(|post| (post.pub_date, post.id))
            .cloned()
    }

    fn sorted_matches(&self, filter: &PostFilter) -> Vec<PostRecord> {
        let mut matches: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| filter_matches(filter, post))
            .cloned()
            .collect();
        matches.sort_by(|a, b| (b.pub_date, b.id).cmp(&(a.pub_date, a.id)));
        matches
    }
}

fn filter_matches(filter: &PostFilter, post: &PostRecord) -> bool {
    match filter {
        PostFilter::All => true,
        PostFilter::Group(group_id) => post.group_id == Some(*group_id),
        PostFilter::Author(author_id) => post.author_id == *author_id,
        PostFilter::AuthorAmong(author_ids) => author_ids.contains(&post.author_id),
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.id == id)
            .cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups = self.groups.lock().unwrap().clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_page(
        &self,
        filter: &PostFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let matches = self.sorted_matches(filter);
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= matches.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(limit as usize).min(matches.len());
        Ok(matches[start..end].to_vec())
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        Ok(self.sorted_matches(filter).len() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: NewPostParams) -> Result<PostRecord, RepoError> {
        let post = PostRecord {
            id: Uuid::new_v4(),
            text: params.text,
            author_id: params.author_id,
            group_id: params.group_id,
            image_path: params.image_path,
            pub_date: self.next_timestamp(),
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        if let Some(image_path) = params.image_path {
            post.image_path = Some(image_path);
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        self.posts.lock().unwrap().retain(|post| post.id != id);
        self.comments
            .lock()
            .unwrap()
            .retain(|comment| comment.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(comments)
    }

    async fn create_comment(&self, params: NewCommentParams) -> Result<CommentRecord, RepoError> {
        let comment = CommentRecord {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: self.next_timestamp(),
        };
        self.comments.lock().unwrap().push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        let exists = follows
            .iter()
            .any(|edge| edge.follower_id == follower_id && edge.following_id == following_id);
        if exists {
            return Ok(false);
        }
        follows.push(FollowRecord {
            follower_id,
            following_id,
        });
        Ok(true)
    }

    async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> Result<bool, RepoError> {
        let mut follows = self.follows.lock().unwrap();
        let before = follows.len();
        follows
            .retain(|edge| !(edge.follower_id == follower_id && edge.following_id == following_id));
        Ok(follows.len() != before)
    }

    async fn is_following(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
    ) -> Result<bool, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .any(|edge| edge.follower_id == follower_id && edge.following_id == following_id))
    }

    async fn following_ids(&self, follower_id: Uuid) -> Result<Vec<Uuid>, RepoError> {
        Ok(self
            .follows
            .lock()
            .unwrap()
            .iter()
            .filter(|edge| edge.follower_id == follower_id)
            .map(|edge| edge.following_id)
            .collect())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepositories>,
    pub cache: Arc<FeedPageCache>,
    media_dir: tempfile::TempDir,
}

pub fn build_app() -> TestApp {
    build_app_with_cache(false)
}

pub fn build_app_with_cache(cache_enabled: bool) -> TestApp {
    let repos = Arc::new(MemoryRepositories::default());
    let media_dir = tempfile::tempdir().expect("media tempdir");
    let media =
        Arc::new(MediaStorage::new(media_dir.path().to_path_buf()).expect("media storage"));
    let cache = Arc::new(FeedPageCache::new(cache_enabled));

    let posts_repo: Arc<dyn PostsRepo> = repos.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repos.clone();
    let users_repo: Arc<dyn UsersRepo> = repos.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repos.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repos.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repos.clone();

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        users_repo.clone(),
        groups_repo.clone(),
        follows_repo.clone(),
        comments_repo.clone(),
    ));
    let posts = Arc::new(PostService::new(
        posts_repo,
        posts_write_repo,
        comments_repo,
        groups_repo.clone(),
    ));
    let follows = Arc::new(FollowService::new(follows_repo, users_repo.clone()));

    let state = HttpState {
        feed,
        posts,
        follows,
        users: users_repo,
        groups: groups_repo,
        media,
        feed_cache: cache.clone(),
        page_size: DEFAULT_PAGE_SIZE,
    };

    TestApp {
        router: build_router(state),
        repos,
        cache,
        media_dir,
    }
}

pub async fn get(app: &TestApp, path: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn get_as(app: &TestApp, path: &str, username: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(path)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={username}"))
        .body(Body::empty())
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn post_form(app: &TestApp, path: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn post_form_as(
    app: &TestApp,
    path: &str,
    username: &str,
    body: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={username}"))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

const MULTIPART_BOUNDARY: &str = "brusio-test-boundary";

/// Build a multipart/form-data payload matching the post form's fields.
pub fn multipart_form(
    text: &str,
    group: Option<&str>,
    image: Option<(&str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\n{text}\r\n"
        )
        .as_bytes(),
    );

    if let Some(group) = group {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"group\"\r\n\r\n{group}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((filename, data)) = image {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    (
        format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        body,
    )
}

pub async fn post_multipart_as(
    app: &TestApp,
    path: &str,
    username: &str,
    content_type: &str,
    body: Vec<u8>,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={username}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("request");
    app.router.clone().oneshot(request).await.expect("response")
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn location_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .expect("location header")
        .to_string()
}

pub fn assert_redirects_to(response: &Response<Body>, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location_header(response), expected);
}
