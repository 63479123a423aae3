use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use test_log::test;
use tower::ServiceExt;

use super::router;
use crate::cache::LiveCache;
use crate::config::Config;
use crate::db::{DbStore, MemoryStore, ReviewStatus, SubmissionStatus};
use crate::state::AppState;

const ADMIN: &str = "ucitel@skola.cz";
const ANA: &str = "ana@skola.cz";
const JAN: &str = "jan@skola.cz";

async fn app() -> (Router, DbStore) {
    let store: DbStore = Arc::new(MemoryStore::new());
    let (cache, _watcher) = LiveCache::start(store.clone()).await.unwrap();
    let config = Config {
        database_url: "memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        admin_email: Some(ADMIN.into()),
        auth_email_header: "x-forwarded-email".into(),
        sign_in_url: "/oauth2/sign_in".into(),
        sign_out_url: "/oauth2/sign_out".into(),
    };
    let state = Arc::new(AppState {
        store: store.clone(),
        cache,
        config: Arc::new(config),
    });

    (router(state), store)
}

fn get(uri: &str, email: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(email) = email {
        builder = builder.header("x-forwarded-email", email);
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, email: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(email) = email {
        builder = builder.header("x-forwarded-email", email);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn submit(app: &Router, email: &str, link: &str) -> Response {
    send(app, post("/submissions", Some(email), &format!("link={link}"))).await
}

#[test(tokio::test)]
async fn anonymous_visitor_is_asked_to_sign_in() {
    let (app, _) = app().await;

    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = text(response).await;
    assert!(body.contains("href=\"&#x2F;oauth2&#x2F;sign_in\""));
    assert!(body.contains("Přihlásit se"));
    assert!(!body.contains("Odevzdat práci"));
    assert!(!body.contains("Template error"));
}

#[test(tokio::test)]
async fn writes_require_identity_and_admin_actions_require_the_administrator() {
    let (app, _) = app().await;

    let response = send(&app, post("/submissions", None, "link=https%3A%2F%2Fa.cz")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, post("/admin/clear", Some(ANA), "")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, get("/admin/export", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/admin/export", Some(JAN))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[test(tokio::test)]
async fn student_cannot_open_admin_tab() {
    let (app, _) = app().await;

    let body = text(send(&app, get("/?tab=admin", Some(ANA))).await).await;

    assert!(body.contains("Odevzdat práci"));
    assert!(!body.contains("Smazat všechny práce a hodnocení"));
}

#[test(tokio::test)]
async fn submitted_work_shows_up_for_its_author() {
    let (app, store) = app().await;

    let response = submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?tab=work&notice=submitted");

    let submissions = store.submissions().await.unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].author, ANA);
    assert_eq!(submissions[0].status, SubmissionStatus::Pending);

    let body = text(send(&app, get("/?tab=work&notice=submitted", Some(ANA))).await).await;
    assert!(body.contains("https:&#x2F;&#x2F;example.com&#x2F;ana"));
    assert!(body.contains("Práce byla odevzdána."));

    let body = text(send(&app, get("/?tab=work", Some(JAN))).await).await;
    assert!(!body.contains("example.com&#x2F;ana"));
}

#[test(tokio::test)]
async fn invalid_links_are_not_stored() {
    let (app, store) = app().await;

    let response = submit(&app, ANA, "ftp%3A%2F%2Fexample.com").await;
    assert_eq!(location(&response), "/?tab=work&notice=invalid_link");

    let response = submit(&app, ANA, "+++").await;
    assert_eq!(location(&response), "/?tab=work&notice=empty_link");

    assert!(store.submissions().await.unwrap().is_empty());
}

#[test(tokio::test)]
async fn own_work_is_never_assigned() {
    let (app, store) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;

    let response = send(&app, post("/reviews/pickup", Some(ANA), "")).await;

    assert_eq!(location(&response), "/?tab=reviews&notice=nothing_available");
    assert!(store.reviews().await.unwrap().is_empty());
}

#[test(tokio::test)]
async fn review_flow_from_pickup_to_export() {
    let (app, store) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;

    let response = send(&app, post("/reviews/pickup", Some(JAN), "")).await;
    assert_eq!(location(&response), "/?tab=reviews&notice=picked_up");

    let response = send(&app, post("/reviews/pickup", Some(JAN), "")).await;
    assert_eq!(location(&response), "/?tab=reviews&notice=nothing_available");

    let reviews = store.reviews().await.unwrap();
    assert_eq!(reviews.len(), 1);
    let id = reviews[0].id.clone();
    let finish = format!("/reviews/{id}/finish");

    let response = send(&app, post(&finish, Some(JAN), "score=150&comment=")).await;
    assert_eq!(location(&response), "/?tab=reviews&notice=invalid_score");

    let response = send(&app, post(&finish, Some(ANA), "score=10&comment=")).await;
    assert_eq!(location(&response), "/?tab=reviews&notice=forbidden");

    let response = send(&app, post(&finish, Some(JAN), "score=85&comment=P%C4%9Bkn%C3%A1+pr%C3%A1ce")).await;
    assert_eq!(location(&response), "/?tab=reviews&notice=review_saved");

    let review = &store.reviews().await.unwrap()[0];
    assert_eq!(review.status, ReviewStatus::Finished);
    assert_eq!(review.score, Some(85));
    assert_eq!(store.submissions().await.unwrap()[0].review_count, 1);

    let body = text(send(&app, get("/?tab=work", Some(ANA))).await).await;
    assert!(body.contains("Pěkná práce"));
    assert!(!body.contains(JAN));

    let response = send(&app, get("/admin/export", Some(ADMIN))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("vzajemne-hodnoceni.csv"));

    let csv = text(response).await;
    assert!(csv.starts_with('\u{feff}'));
    assert!(csv.contains("\"85 / 100\""));
    assert!(csv.contains("\"Pěkná práce\""));
}

#[test(tokio::test)]
async fn export_follows_the_table_filter() {
    let (app, _) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    submit(&app, JAN, "https%3A%2F%2Fexample.com%2Fjan").await;
    send(&app, post("/reviews/pickup", Some(JAN), "")).await;

    let csv = text(
        send(
            &app,
            get("/admin/export?filter_column=status&filter=unassigned", Some(ADMIN)),
        )
        .await,
    )
    .await;

    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("https://example.com/jan"));
    assert!(!csv.contains("https://example.com/ana"));
}

#[test(tokio::test)]
async fn deleting_a_submission_removes_its_reviews() {
    let (app, store) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    send(&app, post("/reviews/pickup", Some(JAN), "")).await;
    let id = store.submissions().await.unwrap()[0].id.clone();
    let delete = format!("/submissions/{id}/delete");

    let response = send(&app, post(&delete, Some(JAN), "")).await;
    assert_eq!(location(&response), "/?tab=work&notice=forbidden");
    assert_eq!(store.reviews().await.unwrap().len(), 1);

    let response = send(&app, post(&delete, Some(ADMIN), "")).await;
    assert_eq!(location(&response), "/?tab=admin&notice=deleted");
    assert!(store.submissions().await.unwrap().is_empty());
    assert!(store.reviews().await.unwrap().is_empty());
}

#[test(tokio::test)]
async fn author_can_delete_own_submission_with_its_reviews() {
    let (app, store) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    send(&app, post("/reviews/pickup", Some(JAN), "")).await;
    let id = store.submissions().await.unwrap()[0].id.clone();
    assert_eq!(store.reviews().await.unwrap()[0].submission_id, id);

    let response = send(&app, post(&format!("/submissions/{id}/delete"), Some(ANA), "")).await;

    assert_eq!(location(&response), "/?tab=work&notice=deleted");
    assert!(store.submissions().await.unwrap().is_empty());
    assert!(store
        .reviews()
        .await
        .unwrap()
        .iter()
        .all(|r| r.submission_id != id));
}

#[test(tokio::test)]
async fn settings_are_validated_before_saving() {
    let (app, store) = app().await;

    let response = send(
        &app,
        post("/admin/settings", Some(ADMIN), "reviews_per_submission=0&max_score=10"),
    )
    .await;
    assert_eq!(location(&response), "/?tab=admin&notice=invalid_settings");

    let response = send(
        &app,
        post("/admin/settings", Some(ADMIN), "reviews_per_submission=2&max_score=150"),
    )
    .await;
    assert_eq!(location(&response), "/?tab=admin&notice=invalid_settings");
    assert_eq!(store.settings().await.unwrap().max_score, 100);

    let response = send(
        &app,
        post("/admin/settings", Some(ADMIN), "reviews_per_submission=2&max_score=10"),
    )
    .await;
    assert_eq!(location(&response), "/?tab=admin&notice=settings_saved");

    let settings = store.settings().await.unwrap();
    assert_eq!(settings.reviews_per_submission, 2);
    assert_eq!(settings.max_score, 10);
}

#[test(tokio::test)]
async fn clearing_removes_everything_but_settings() {
    let (app, store) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    send(&app, post("/reviews/pickup", Some(JAN), "")).await;

    let response = send(&app, post("/admin/clear", Some(ADMIN), "")).await;

    assert_eq!(location(&response), "/?tab=admin&notice=cleared");
    assert!(store.submissions().await.unwrap().is_empty());
    assert!(store.reviews().await.unwrap().is_empty());
    assert_eq!(store.settings().await.unwrap().reviews_per_submission, 3);
}

#[test(tokio::test)]
async fn snapshot_is_limited_for_students() {
    let (app, _) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;
    submit(&app, JAN, "https%3A%2F%2Fexample.com%2Fjan").await;

    let response = send(&app, get("/api/snapshot", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = text(send(&app, get("/api/snapshot", Some(ANA))).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["submissions"].as_array().unwrap().len(), 1);
    assert_eq!(json["settings"]["maxScore"], 100);

    let body = text(send(&app, get("/api/snapshot", Some(ADMIN))).await).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["submissions"].as_array().unwrap().len(), 2);
}

#[test(tokio::test)]
async fn admin_table_respects_column_preferences() {
    let (app, _) = app().await;
    submit(&app, ANA, "https%3A%2F%2Fexample.com%2Fana").await;

    let body = text(send(&app, get("/?tab=admin", Some(ADMIN))).await).await;
    assert!(!body.contains("Template error"));
    assert!(body.contains("Nepřiřazeno"));
    assert_eq!(body.matches("<th>").count(), 10);

    let response = send(&app, post("/preferences/columns", Some(ADMIN), "sender=on&score=on")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("columns="));

    let pair = cookie.split(';').next().unwrap_or_default();
    let request = Request::builder()
        .uri("/?tab=admin")
        .header("x-forwarded-email", ADMIN)
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let body = text(send(&app, request).await).await;
    assert_eq!(body.matches("<th>").count(), 3);
}
