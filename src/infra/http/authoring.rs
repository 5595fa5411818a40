//! Write surface: post forms, comments, follow toggles.

use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        error::{HttpError, repo_error_to_http},
        follows::FollowError,
        posts::ComposeError,
    },
    domain::{
        drafts::{CommentDraft, FieldErrors, ImageUpload, PostDraft},
        entities::{GroupRecord, PostRecord, UserRecord},
    },
    presentation::views::{
        GroupOption, PostFormTemplate, PostFormView, render_not_found_response,
        render_template_response,
    },
};

use super::{
    public::HttpState,
    session::{redirect_found, require_viewer, viewer_context},
};

const SOURCE: &str = "infra::http::authoring";

pub(super) async fn create_post_form(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let viewer = match require_viewer(&jar, &state.users, "/create/").await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let groups = match state.groups.list_all().await {
        Ok(groups) => groups,
        Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
    };

    render_post_form(
        &viewer,
        create_form_view(&PostDraft::default(), groups, FieldErrors::default()),
        StatusCode::OK,
    )
}

pub(super) async fn create_post_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let viewer = match require_viewer(&jar, &state.users, "/create/").await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let draft = match read_post_form(multipart).await {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };

    // Validate before the image touches disk; a rejected submission must
    // not leave a stored file behind.
    match state.posts.check_draft(&draft).await {
        Ok(()) => {}
        Err(ComposeError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
            };
            return render_post_form(
                &viewer,
                create_form_view(&draft, groups, errors),
                StatusCode::OK,
            );
        }
        Err(err) => return compose_error_to_response(&viewer, "/", err),
    }

    let image_path = match store_image(&state, &draft).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    match state.posts.create_post(viewer.id, &draft, image_path).await {
        Ok(_) => redirect_found(&format!("/profile/{}/", viewer.username)),
        Err(ComposeError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
            };
            render_post_form(&viewer, create_form_view(&draft, groups, errors), StatusCode::OK)
        }
        Err(err) => compose_error_to_response(&viewer, "/", err),
    }
}

pub(super) async fn edit_post_form(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
) -> Response {
    let viewer = match require_viewer(&jar, &state.users, &format!("/posts/{id}/edit/")).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer_context(&Some(viewer)));
    };

    match state.posts.editable_post(post_id, viewer.id).await {
        Ok(post) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
            };
            render_post_form(
                &viewer,
                edit_form_view(&post, groups, FieldErrors::default()),
                StatusCode::OK,
            )
        }
        Err(err) => compose_error_to_response(&viewer, &format!("/posts/{post_id}/"), err),
    }
}

pub(super) async fn edit_post_submit(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    multipart: Multipart,
) -> Response {
    let viewer = match require_viewer(&jar, &state.users, &format!("/posts/{id}/edit/")).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer_context(&Some(viewer)));
    };

    let draft = match read_post_form(multipart).await {
        Ok(draft) => draft,
        Err(err) => return err.into_response(),
    };

    // Authorization and validation both come before the image is stored,
    // so a rejected edit leaves no file behind.
    if let Err(err) = state.posts.editable_post(post_id, viewer.id).await {
        return compose_error_to_response(&viewer, &format!("/posts/{post_id}/"), err);
    }
    match state.posts.check_draft(&draft).await {
        Ok(()) => {}
        Err(ComposeError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
            };
            let mut view = create_form_view(&draft, groups, errors);
            view.heading = "Edit post";
            view.submit_label = "Save";
            view.action = format!("/posts/{post_id}/edit/");
            return render_post_form(&viewer, view, StatusCode::OK);
        }
        Err(err) => {
            return compose_error_to_response(&viewer, &format!("/posts/{post_id}/"), err);
        }
    }

    let image_path = match store_image(&state, &draft).await {
        Ok(path) => path,
        Err(err) => return err.into_response(),
    };

    match state
        .posts
        .edit_post(post_id, viewer.id, &draft, image_path)
        .await
    {
        Ok(post) => redirect_found(&format!("/posts/{}/", post.id)),
        Err(ComposeError::Invalid(errors)) => {
            let groups = match state.groups.list_all().await {
                Ok(groups) => groups,
                Err(err) => return repo_error_to_http(SOURCE, err).into_response(),
            };
            let mut view = create_form_view(&draft, groups, errors);
            view.heading = "Edit post";
            view.submit_label = "Save";
            view.action = format!("/posts/{post_id}/edit/");
            render_post_form(&viewer, view, StatusCode::OK)
        }
        Err(err) => compose_error_to_response(&viewer, &format!("/posts/{post_id}/"), err),
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentForm {
    #[serde(default)]
    text: String,
}

pub(super) async fn add_comment(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<CommentForm>,
) -> Response {
    let viewer = match require_viewer(&jar, &state.users, &format!("/posts/{id}/comment/")).await {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let Ok(post_id) = Uuid::parse_str(&id) else {
        return render_not_found_response(viewer_context(&Some(viewer)));
    };

    let draft = CommentDraft { text: form.text };
    match state.posts.add_comment(post_id, viewer.id, &draft).await {
        // An invalid comment is dropped; either way the browser lands back
        // on the post detail page.
        Ok(_) | Err(ComposeError::Invalid(_)) => {
            redirect_found(&format!("/posts/{post_id}/"))
        }
        Err(err) => compose_error_to_response(&viewer, &format!("/posts/{post_id}/"), err),
    }
}

pub(super) async fn follow_author(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Response {
    let viewer =
        match require_viewer(&jar, &state.users, &format!("/profile/{username}/follow/")).await {
            Ok(viewer) => viewer,
            Err(response) => return response,
        };

    match state.follows.follow(&viewer, &username).await {
        Ok(()) => redirect_found(&format!("/profile/{username}/")),
        Err(err) => follow_error_to_response(&viewer, err),
    }
}

pub(super) async fn unfollow_author(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    jar: CookieJar,
) -> Response {
    let viewer = match require_viewer(
        &jar,
        &state.users,
        &format!("/profile/{username}/unfollow/"),
    )
    .await
    {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    match state.follows.unfollow(&viewer, &username).await {
        Ok(()) => redirect_found(&format!("/profile/{username}/")),
        Err(err) => follow_error_to_response(&viewer, err),
    }
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostDraft, HttpError> {
    let mut draft = PostDraft::default();

    loop {
        let field = multipart.next_field().await.map_err(|err| {
            HttpError::from_error(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Malformed form submission",
                &err,
            )
        })?;
        let Some(field) = field else { break };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("text") => {
                draft.text = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
            }
            Some("group") => {
                let value = field.text().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    draft.group_id = Uuid::parse_str(trimmed).ok();
                }
            }
            Some("image") => {
                let filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|err| {
                    HttpError::from_error(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form submission",
                        &err,
                    )
                })?;
                if let Some(filename) = filename
                    && !filename.is_empty()
                    && !data.is_empty()
                {
                    draft.image = Some(ImageUpload { filename, data });
                }
            }
            _ => {}
        }
    }

    Ok(draft)
}

async fn store_image(state: &HttpState, draft: &PostDraft) -> Result<Option<String>, HttpError> {
    match &draft.image {
        Some(upload) => state
            .media
            .store(&upload.filename, upload.data.clone())
            .await
            .map(Some)
            .map_err(|err| {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store uploaded image",
                    &err,
                )
            }),
        None => Ok(None),
    }
}

fn create_form_view(
    draft: &PostDraft,
    groups: Vec<GroupRecord>,
    errors: FieldErrors,
) -> PostFormView {
    PostFormView {
        heading: "New post",
        submit_label: "Publish",
        action: "/create/".to_string(),
        text: draft.text.clone(),
        groups: group_options(groups, draft.group_id),
        errors,
    }
}

fn edit_form_view(post: &PostRecord, groups: Vec<GroupRecord>, errors: FieldErrors) -> PostFormView {
    PostFormView {
        heading: "Edit post",
        submit_label: "Save",
        action: format!("/posts/{}/edit/", post.id),
        text: post.text.clone(),
        groups: group_options(groups, post.group_id),
        errors,
    }
}

fn group_options(groups: Vec<GroupRecord>, selected: Option<Uuid>) -> Vec<GroupOption> {
    groups
        .into_iter()
        .map(|group| GroupOption {
            selected: selected == Some(group.id),
            id: group.id,
            title: group.title,
        })
        .collect()
}

fn render_post_form(viewer: &UserRecord, form: PostFormView, status: StatusCode) -> Response {
    render_template_response(
        PostFormTemplate {
            viewer: viewer_context(&Some(viewer.clone())),
            form,
        },
        status,
    )
}

fn compose_error_to_response(viewer: &UserRecord, post_path: &str, err: ComposeError) -> Response {
    match err {
        ComposeError::PostNotFound => render_not_found_response(viewer_context(&Some(viewer.clone()))),
        // Someone else's post: bounce to the detail page instead of the
        // edit surface.
        ComposeError::NotAuthor => redirect_found(post_path),
        ComposeError::Invalid(_) => HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Invalid submission",
            "submission failed validation",
        )
        .into_response(),
        ComposeError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}

fn follow_error_to_response(viewer: &UserRecord, err: FollowError) -> Response {
    match err {
        FollowError::UnknownUser => render_not_found_response(viewer_context(&Some(viewer.clone()))),
        FollowError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
