pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower::Layer;
use tower_http::{
    cors::CorsLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};

use crate::accounts::handlers as accounts;
use crate::applications::handlers as applications;
use crate::companies::handlers as companies;
use crate::h1b::handlers as h1b;
use crate::internships::handlers as internships;
use crate::jobgpt::handlers as jobgpt;
use crate::jobgpt::resume::MAX_RESUME_BYTES;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted resume.
const UPLOAD_BODY_LIMIT: usize = MAX_RESUME_BYTES + 64 * 1024;

/// The served application: the router with tracing and CORS, behind
/// trailing-slash normalisation so `/api/applications/` and
/// `/api/applications` reach the same handler. Normalisation has to wrap the
/// router because route matching happens inside it.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    let router = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the deployed frontend
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/auth/register", post(accounts::handle_register))
        .route("/api/auth/login", post(accounts::handle_login))
        .route("/api/auth/refresh", post(accounts::handle_refresh))
        .route(
            "/api/auth/user",
            get(accounts::handle_get_user).patch(accounts::handle_update_user),
        )
        .route("/api/token", post(accounts::handle_login))
        .route("/api/token/refresh", post(accounts::handle_refresh))
        .route("/api/token/verify", post(accounts::handle_verify))
        .route("/api/profile", get(accounts::handle_get_profile))
        // Companies
        .route(
            "/api/companies",
            get(companies::handle_list_companies).post(companies::handle_create_company),
        )
        .route("/api/companies/identify", post(companies::handle_identify_company))
        .route(
            "/api/companies/by-name/:name/applications",
            get(companies::handle_company_applications),
        )
        .route(
            "/api/companies/:id",
            get(companies::handle_get_company)
                .put(companies::handle_replace_company)
                .patch(companies::handle_update_company)
                .delete(companies::handle_delete_company),
        )
        // Jobs
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route(
            "/api/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_replace_job)
                .patch(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        .route("/api/jobs/:id/apply", post(jobs::handle_apply))
        // Application tracking
        .route(
            "/api/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route(
            "/api/applications/sync-gmail",
            post(applications::handle_sync_gmail),
        )
        .route(
            "/api/applications/:id",
            get(applications::handle_get_application)
                .put(applications::handle_replace_application)
                .patch(applications::handle_update_application)
                .delete(applications::handle_delete_application),
        )
        .route("/api/gmail/account", put(applications::handle_link_gmail_account))
        // Internship feed and mirrored postings
        .route("/api/internships", get(internships::handle_internships))
        .route("/api/job-postings", get(internships::handle_job_postings))
        // JobGPT
        .route("/api/jobgpt/prompt", post(jobgpt::handle_prompt))
        .route("/api/jobgpt/why-company", post(jobgpt::handle_why_company))
        .route("/api/jobgpt/why-role", post(jobgpt::handle_why_role))
        .route("/api/jobgpt/thank-you", post(jobgpt::handle_thank_you))
        .route(
            "/api/jobgpt/resume/upload",
            post(jobgpt::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/jobgpt/resume/match", post(jobgpt::handle_match_resume))
        // H1B
        .route("/api/h1b", get(h1b::handle_list_h1b))
        .route("/api/h1b/stats", get(h1b::handle_h1b_stats))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::accounts::jwt::{issue_token, TokenType};

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let app = build_app(AppState::for_tests());
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "offersplus-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let (status, body) =
            send(Request::get("/api/applications").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_garbage_bearer_is_rejected() {
        let request = Request::get("/api/auth/user")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_verify() {
        let secret = AppState::for_tests().config.jwt_secret;
        let token = issue_token(&secret, Uuid::new_v4(), "ada", TokenType::Access).unwrap();

        let (status, body) = send(post_json("/api/token/verify", serde_json::json!({ "token": token }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({}));

        let (status, _) = send(post_json("/api/token/verify", serde_json::json!({ "token": "x.y.z" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_issues_access_token() {
        let secret = AppState::for_tests().config.jwt_secret;
        let refresh = issue_token(&secret, Uuid::new_v4(), "ada", TokenType::Refresh).unwrap();
        let access = issue_token(&secret, Uuid::new_v4(), "ada", TokenType::Access).unwrap();

        let (status, body) = send(post_json("/api/token/refresh", serde_json::json!({ "refresh": refresh }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, _) = send(post_json("/api/auth/refresh", serde_json::json!({ "refresh": access }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_trailing_slash_paths_are_routed() {
        let (status, _) =
            send(Request::get("/api/applications/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(Request::get("/api/auth/user/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            send(post_json("/api/token/verify/", serde_json::json!({ "token": "x.y.z" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(Request::get("/health/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, _) = send(Request::get("/api/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
