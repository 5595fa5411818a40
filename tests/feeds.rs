//! Feed listings: pagination, group and author scoping, the follow feed.

mod support;

use axum::http::StatusCode;
use support::{assert_redirects_to, body_string, build_app, get, get_as};

fn count_cards(body: &str) -> usize {
    body.matches("data-post-id=").count()
}

#[tokio::test]
async fn index_paginates_ten_posts_per_page() {
    let app = build_app();
    let author = app.repos.add_user("leo");
    for n in 0..15 {
        app.repos.add_post(&author, None, &format!("Post number {n}"));
    }

    let body = body_string(get(&app, "/").await).await;
    assert_eq!(count_cards(&body), 10);

    let body = body_string(get(&app, "/?page=2").await).await;
    assert_eq!(count_cards(&body), 5);

    let body = body_string(get(&app, "/?page=3").await).await;
    assert_eq!(count_cards(&body), 0);
}

#[tokio::test]
async fn junk_page_values_read_as_page_one() {
    let app = build_app();
    let author = app.repos.add_user("leo");
    for n in 0..12 {
        app.repos.add_post(&author, None, &format!("Post number {n}"));
    }

    for path in ["/?page=abc", "/?page=", "/?page=-1"] {
        let response = get(&app, path).await;
        assert_eq!(response.status(), StatusCode::OK, "path {path}");
        let body = body_string(response).await;
        assert_eq!(count_cards(&body), 10, "path {path}");
    }
}

#[tokio::test]
async fn newest_post_leads_the_index() {
    let app = build_app();
    let author = app.repos.add_user("leo");
    app.repos.add_post(&author, None, "older entry");
    let newest = app.repos.add_post(&author, None, "newest entry");

    let body = body_string(get(&app, "/").await).await;

    let newest_at = body
        .find(&format!("data-post-id=\"{}\"", newest.id))
        .expect("newest post rendered");
    let older_at = body.find("older entry").expect("older post rendered");
    assert!(newest_at < older_at);
}

#[tokio::test]
async fn group_page_lists_only_that_group() {
    let app = build_app();
    let author = app.repos.add_user("leo");
    let cats = app.repos.add_group("Cats", "cats", "About cats");
    let dogs = app.repos.add_group("Dogs", "dogs", "About dogs");
    app.repos.add_post(&author, Some(&cats), "a cat post");
    app.repos.add_post(&author, Some(&dogs), "a dog post");
    app.repos.add_post(&author, None, "an ungrouped post");

    let body = body_string(get(&app, "/group/cats/").await).await;

    assert_eq!(count_cards(&body), 1);
    assert!(body.contains("a cat post"));
    assert!(!body.contains("a dog post"));
    assert!(!body.contains("an ungrouped post"));
}

#[tokio::test]
async fn profile_lists_only_the_authors_posts() {
    let app = build_app();
    let leo = app.repos.add_user("leo");
    let mia = app.repos.add_user("mia");
    app.repos.add_post(&leo, None, "written by leo");
    app.repos.add_post(&mia, None, "written by mia");

    let body = body_string(get(&app, "/profile/leo/").await).await;

    assert_eq!(count_cards(&body), 1);
    assert!(body.contains("written by leo"));
    assert!(!body.contains("written by mia"));
}

#[tokio::test]
async fn follow_feed_shows_followed_authors_only() {
    let app = build_app();
    app.repos.add_user("reader");
    let leo = app.repos.add_user("leo");
    let mia = app.repos.add_user("mia");
    app.repos.add_post(&leo, None, "noise from leo");
    app.repos.add_post(&mia, None, "from mia");

    let response = get_as(&app, "/profile/mia/follow/", "reader").await;
    assert_redirects_to(&response, "/profile/mia/");
    assert_eq!(app.repos.follow_count(), 1);

    let body = body_string(get_as(&app, "/follow/", "reader").await).await;
    assert!(body.contains("from mia"));
    assert!(!body.contains("noise from leo"));

    // A viewer following nobody sees an empty feed.
    app.repos.add_user("loner");
    let body = body_string(get_as(&app, "/follow/", "loner").await).await;
    assert_eq!(count_cards(&body), 0);
}

#[tokio::test]
async fn following_twice_keeps_a_single_edge() {
    let app = build_app();
    app.repos.add_user("reader");
    app.repos.add_user("mia");

    get_as(&app, "/profile/mia/follow/", "reader").await;
    let response = get_as(&app, "/profile/mia/follow/", "reader").await;

    assert_redirects_to(&response, "/profile/mia/");
    assert_eq!(app.repos.follow_count(), 1);
}

#[tokio::test]
async fn unfollow_empties_the_feed() {
    let app = build_app();
    app.repos.add_user("reader");
    let mia = app.repos.add_user("mia");
    app.repos.add_post(&mia, None, "from mia");

    get_as(&app, "/profile/mia/follow/", "reader").await;
    let response = get_as(&app, "/profile/mia/unfollow/", "reader").await;

    assert_redirects_to(&response, "/profile/mia/");
    assert_eq!(app.repos.follow_count(), 0);
    let body = body_string(get_as(&app, "/follow/", "reader").await).await;
    assert_eq!(count_cards(&body), 0);
}

#[tokio::test]
async fn unfollowing_without_an_edge_is_harmless() {
    let app = build_app();
    app.repos.add_user("reader");
    app.repos.add_user("mia");

    let response = get_as(&app, "/profile/mia/unfollow/", "reader").await;

    assert_redirects_to(&response, "/profile/mia/");
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn self_follow_is_a_silent_no_op() {
    let app = build_app();
    app.repos.add_user("leo");

    let response = get_as(&app, "/profile/leo/follow/", "leo").await;

    assert_redirects_to(&response, "/profile/leo/");
    assert_eq!(app.repos.follow_count(), 0);
}

#[tokio::test]
async fn following_an_unknown_user_is_not_found() {
    let app = build_app();
    app.repos.add_user("reader");

    let response = get_as(&app, "/profile/nobody/follow/", "reader").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.repos.follow_count(), 0);
}
