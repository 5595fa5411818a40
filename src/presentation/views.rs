use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::drafts::FieldErrors;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<ViewerContext>) -> Response {
    let mut response =
        render_template_response(NotFoundTemplate { viewer }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// The signed-in user as the layout header shows them.
#[derive(Clone)]
pub struct ViewerContext {
    pub username: String,
}

#[derive(Clone)]
pub struct GroupBadge {
    pub slug: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub preview: String,
    pub author_username: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
    pub published: String,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub created: String,
}

pub struct PostDetailView {
    pub viewer_is_author: bool,
    pub author_post_total: u64,
    pub post: PostCard,
    pub comments: Vec<CommentView>,
}

/// Page-number navigation rendered below every listing.
#[derive(Clone)]
pub struct PaginatorView {
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_number: u32,
    pub next_number: u32,
    pub base_path: String,
}

impl PaginatorView {
    pub fn new<T>(page: &Page<T>, base_path: impl Into<String>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages(),
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_number: page.number.saturating_sub(1).max(1),
            next_number: page.number.saturating_add(1),
            base_path: base_path.into(),
        }
    }
}

/// A listing plus its paginator, the shape every feed template renders.
pub struct FeedContext {
    pub posts: Vec<PostCard>,
    pub total: u64,
    pub paginator: PaginatorView,
}

impl FeedContext {
    pub fn new(page: Page<PostCard>, base_path: impl Into<String>) -> Self {
        let paginator = PaginatorView::new(&page, base_path);
        Self {
            posts: page.items,
            total: page.total,
            paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub viewer: Option<ViewerContext>,
    pub content: FeedContext,
}

pub struct GroupHeaderView {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "group_list.html")]
pub struct GroupTemplate {
    pub viewer: Option<ViewerContext>,
    pub group: GroupHeaderView,
    pub content: FeedContext,
}

pub struct ProfileHeaderView {
    pub username: String,
    pub post_total: u64,
    pub is_self: bool,
    pub viewer_is_following: bool,
    pub show_follow_toggle: bool,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub viewer: Option<ViewerContext>,
    pub author: ProfileHeaderView,
    pub content: FeedContext,
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub viewer: Option<ViewerContext>,
    pub detail: PostDetailView,
}

#[derive(Clone)]
pub struct GroupOption {
    pub id: Uuid,
    pub title: String,
    pub selected: bool,
}

/// The shared create/edit post form.
pub struct PostFormView {
    pub heading: &'static str,
    pub submit_label: &'static str,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub errors: FieldErrors,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub viewer: Option<ViewerContext>,
    pub form: PostFormView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowTemplate {
    pub viewer: Option<ViewerContext>,
    pub content: FeedContext,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub viewer: Option<ViewerContext>,
}
