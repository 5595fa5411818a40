//! Public read surface: feeds, post detail, stored media.

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    application::{
        cache::FeedPageCache,
        error::HttpError,
        feed::{FeedError, FeedService},
        follows::FollowService,
        pagination::PageRequest,
        posts::PostService,
        repos::{GroupsRepo, UsersRepo},
    },
    infra::media::{MediaStorage, MediaStorageError},
    presentation::views::{
        FeedContext, FollowTemplate, GroupHeaderView, GroupTemplate, IndexTemplate,
        PostDetailTemplate, ProfileHeaderView, ProfileTemplate, render_not_found_response,
        render_template, render_template_response,
    },
};

use super::{
    authoring,
    middleware::{log_responses, set_request_context},
    session::{require_viewer, resolve_viewer, viewer_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub users: Arc<dyn UsersRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub media: Arc<MediaStorage>,
    pub feed_cache: Arc<FeedPageCache>,
    pub page_size: u32,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_list))
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/follow/", get(authoring::follow_author))
        .route(
            "/profile/{username}/unfollow/",
            get(authoring::unfollow_author),
        )
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/posts/{id}/edit/",
            get(authoring::edit_post_form).post(authoring::edit_post_submit),
        )
        .route("/posts/{id}/comment/", post(authoring::add_comment))
        .route(
            "/create/",
            get(authoring::create_post_form).post(authoring::create_post_submit),
        )
        .route("/follow/", get(following_feed))
        .route("/media/{*path}", get(serve_media))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

fn page_request(state: &HttpState, query: &PageQuery) -> PageRequest {
    // A page value that does not parse reads as page 1, not a 400.
    let number = query
        .page
        .as_deref()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1);
    PageRequest::new(number, state.page_size)
}

fn html_response(body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

async fn index(
    State(state): State<HttpState>,
    jar: axum_extra::extract::CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let request = page_request(&state, &query);

    // The whole first page is memoized as rendered bytes; every viewer gets
    // the same cached response until the cache is invalidated.
    if request.number == 1
        && let Some(cached) = state.feed_cache.get()
    {
        return html_response(cached);
    }

    let viewer = match resolve_viewer(&jar, &state.users).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let page = match state.feed.global(request).await {
        Ok(page) => page,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let template = IndexTemplate {
        viewer: viewer_context(&viewer),
        content: FeedContext::new(page, "/"),
    };
    match render_template(template) {
        Ok(Html(body)) => {
            let body = Bytes::from(body);
            if request.number == 1 {
                state.feed_cache.set(body.clone());
            }
            html_response(body)
        }
        Err(err) => err.into_response(),
    }
}

async fn group_list(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    jar: axum_extra::extract::CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&jar, &state.users).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    match state.feed.group(&slug, page_request(&state, &query)).await {
        Ok(feed) => render_template_response(
            GroupTemplate {
                viewer: viewer_context(&viewer),
                group: GroupHeaderView {
                    title: feed.group.title,
                    slug: feed.group.slug.clone(),
                    description: feed.group.description,
                },
                content: FeedContext::new(feed.page, format!("/group/{}/", feed.group.slug)),
            },
            StatusCode::OK,
        ),
        Err(FeedError::UnknownGroup) => render_not_found_response(viewer_context(&viewer)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    jar: axum_extra::extract::CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match resolve_viewer(&jar, &state.users).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    let viewer_id = viewer.as_ref().map(|user| user.id);

    match state
        .feed
        .author(&username, viewer_id, page_request(&state, &query))
        .await
    {
        Ok(feed) => {
            let is_self = viewer_id == Some(feed.author.id);
            render_template_response(
                ProfileTemplate {
                    viewer: viewer_context(&viewer),
                    author: ProfileHeaderView {
                        username: feed.author.username.clone(),
                        post_total: feed.page.total,
                        is_self,
                        viewer_is_following: feed.viewer_is_following,
                        show_follow_toggle: viewer.is_some() && !is_self,
                    },
                    content: FeedContext::new(
                        feed.page,
                        format!("/profile/{}/", feed.author.username),
                    ),
                },
                StatusCode::OK,
            )
        }
        Err(FeedError::UnknownUser) => render_not_found_response(viewer_context(&viewer)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: axum_extra::extract::CookieJar,
) -> Response {
    let viewer = match resolve_viewer(&jar, &state.users).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    // A malformed id reads the same as an unknown one.
    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer_context(&viewer));
    };

    match state
        .feed
        .detail(post_id, viewer.as_ref().map(|user| user.id))
        .await
    {
        Ok(Some(detail)) => render_template_response(
            PostDetailTemplate {
                viewer: viewer_context(&viewer),
                detail,
            },
            StatusCode::OK,
        ),
        Ok(None) => render_not_found_response(viewer_context(&viewer)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn following_feed(
    State(state): State<HttpState>,
    jar: axum_extra::extract::CookieJar,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer = match require_viewer(&jar, &state.users, "/follow/").await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    match state
        .feed
        .following(viewer.id, page_request(&state, &query))
        .await
    {
        Ok(page) => render_template_response(
            FollowTemplate {
                viewer: viewer_context(&Some(viewer)),
                content: FeedContext::new(page, "/follow/"),
            },
            StatusCode::OK,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn serve_media(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.media.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(MediaStorageError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(MediaStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Media not found",
            "The requested file is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored media"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored file",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

async fn not_found(State(state): State<HttpState>, jar: axum_extra::extract::CookieJar) -> Response {
    let viewer = match resolve_viewer(&jar, &state.users).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    render_not_found_response(viewer_context(&viewer))
}
