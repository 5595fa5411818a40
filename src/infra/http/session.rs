//! Opaque session cookie resolution.
//!
//! Authentication lives outside this service. A signed-in browser carries a
//! `session=<username>` cookie minted by the external auth layer; here it is
//! only resolved against the users repository. An unknown or absent cookie
//! means an anonymous viewer.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use crate::application::error::repo_error_to_http;
use crate::application::repos::UsersRepo;
use crate::domain::entities::UserRecord;
use crate::presentation::views::ViewerContext;

pub const SESSION_COOKIE: &str = "session";
const SOURCE: &str = "infra::http::session";

/// Resolve the viewer behind the session cookie, if any.
pub async fn resolve_viewer(
    jar: &CookieJar,
    users: &Arc<dyn UsersRepo>,
) -> Result<Option<UserRecord>, Response> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let username = cookie.value().trim();
    if username.is_empty() {
        return Ok(None);
    }

    users
        .find_by_username(username)
        .await
        .map_err(|err| repo_error_to_http(SOURCE, err).into_response())
}

/// Resolve the viewer or produce the response that ends the request: a
/// login redirect for anonymous visitors, an error page on repository
/// failure.
pub async fn require_viewer(
    jar: &CookieJar,
    users: &Arc<dyn UsersRepo>,
    next: &str,
) -> Result<UserRecord, Response> {
    match resolve_viewer(jar, users).await? {
        Some(viewer) => Ok(viewer),
        None => Err(login_redirect(next)),
    }
}

/// Redirect to the external login page, carrying the original path in the
/// `next` query parameter.
pub fn login_redirect(next: &str) -> Response {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    redirect_found(&format!("/auth/login/?next={encoded}"))
}

/// A plain `302 Found` redirect. Browser form flows expect `302`, not the
/// `303` that `axum::response::Redirect` emits.
pub fn redirect_found(location: &str) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

pub fn viewer_context(viewer: &Option<UserRecord>) -> Option<ViewerContext> {
    viewer.as_ref().map(|user| ViewerContext {
        username: user.username.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn login_redirect_percent_encodes_the_next_path() {
        let response = login_redirect("/posts/42/edit/");
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header");
        assert_eq!(location, "/auth/login/?next=%2Fposts%2F42%2Fedit%2F");
    }
}
