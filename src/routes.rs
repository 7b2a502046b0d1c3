//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod auth;
mod comments;
mod events;
mod export;
mod me;
mod proposals;
mod reviews;
mod teams;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    extract::State,
    http::{header, HeaderName, Method},
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Header carrying the export API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(settings);

    // Build tracing/logging layer
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Build middleware stack
    let middleware = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Routes requiring a bearer token
    let protected = Router::new()
        // Current user
        .route("/api/me", get(me::get_me).patch(me::update_me))
        .route("/api/me/notifications", get(me::notifications))
        .route("/api/me/proposals", get(me::my_proposals))

        // Teams
        .route("/api/teams", post(teams::create_team).get(teams::list_teams))
        .route("/api/teams/{team}", get(teams::get_team))
        .route("/api/teams/{team}/members", get(teams::list_members))
        .route(
            "/api/teams/{team}/members/{user}",
            patch(teams::change_member_role).delete(teams::remove_member),
        )
        .route("/api/teams/{team}/leave", post(teams::leave_team))
        .route("/api/invitations/{code}/accept", post(teams::accept_invitation))

        // Events
        .route(
            "/api/teams/{team}/events",
            post(events::create_event).get(events::list_events),
        )
        .route("/api/teams/{team}/events/{event}", patch(events::update_event))
        .route("/api/teams/{team}/events/{event}/api-key", post(events::generate_api_key))

        // Speaker side
        .route("/api/events/{slug}/proposals", post(proposals::submit))
        .route(
            "/api/proposals/{id}",
            patch(proposals::update).delete(proposals::withdraw),
        )
        .route("/api/proposals/{id}/confirmation", post(proposals::confirm))

        // Organizer side
        .route(
            "/api/teams/{team}/events/{event}/proposals",
            get(proposals::list_event_proposals),
        )
        .route(
            "/api/teams/{team}/events/{event}/proposals/{id}/reviews",
            get(reviews::review_details),
        )
        .route(
            "/api/teams/{team}/events/{event}/proposals/{id}/review",
            put(reviews::rate),
        )
        .route(
            "/api/teams/{team}/events/{event}/proposals/{id}/deliberation",
            post(proposals::deliberate),
        )
        .route(
            "/api/teams/{team}/events/{event}/publication",
            post(proposals::publish_results),
        )

        // Comments
        .route(
            "/api/proposals/{id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/api/proposals/{id}/comments/{comment}",
            delete(comments::remove_comment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Build the router
    Router::new()
        // Health check
        .route("/health", get(health_check))
        .route("/robots.txt", get(robots))

        // Authentication
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))

        // Public event pages and export
        .route("/api/events/{slug}", get(events::get_public_event))
        .route("/api/v1/event/{slug}", get(export::export_event))

        .merge(protected)
        // Apply middleware and state
        .layer(middleware)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::ACCEPT,
        HeaderName::from_static(API_KEY_HEADER),
    ];

    let cors = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods(methods)
        .allow_headers(headers)
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Crawlers are only let in when SEO is enabled
async fn robots(State(state): State<SharedState>) -> impl IntoResponse {
    let body = if state.seo_enabled {
        "User-agent: *\nAllow: /\n"
    } else {
        "User-agent: *\nDisallow: /\n"
    };
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{LogMailer, MailQueue, RetryPolicy};
    use crate::state::AppState;
    use crate::store::InMemoryRepository;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(seo_enabled: bool) -> Router {
        let settings = Settings {
            seo_enabled,
            ..Settings::default()
        };
        let (mail, _worker) =
            MailQueue::start(Arc::new(LogMailer::new("cfp@test")), RetryPolicy::default());
        let state = Arc::new(AppState::new(
            Arc::new(InMemoryRepository::new()),
            mail,
            &settings,
            "router-test-secret".to_string(),
        ));
        create_router(state, &settings)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": email, "password": "long password", "name": "Ada"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["tokens"]["accessToken"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = app(false);
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_robots_follows_seo_flag() {
        for (seo, expected) in [(false, "Disallow: /"), (true, "Allow: /")] {
            let response = app(seo)
                .oneshot(Request::get("/robots.txt").body(Body::empty()).unwrap())
                .await
                .unwrap();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert!(String::from_utf8_lossy(&bytes).contains(expected));
        }
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = app(false);
        let (status, body) = send(
            &app,
            json_request(Method::GET, "/api/teams", None, Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_team_flow_over_http() {
        let app = app(false);
        let owner = register(&app, "owner@example.org").await;

        let team = json!({"name": "GDG Nantes", "slug": "gdg-nantes"});
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/teams", Some(&owner), team.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["role"], "OWNER");
        let code = body["data"]["invitationCode"].as_str().unwrap().to_string();

        // Same slug again
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/teams", Some(&owner), team),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let reviewer = register(&app, "rita@example.org").await;
        let uri = format!("/api/invitations/{}/accept", code);
        let (status, body) = send(
            &app,
            json_request(Method::POST, &uri, Some(&reviewer), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "REVIEWER");

        let (status, body) = send(
            &app,
            json_request(Method::POST, &uri, Some(&reviewer), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVITATION_INVALID");
    }

    #[tokio::test]
    async fn test_export_rejects_wrong_key() {
        let app = app(false);
        let owner = register(&app, "owner@example.org").await;
        send(
            &app,
            json_request(
                Method::POST,
                "/api/teams",
                Some(&owner),
                json!({"name": "GDG Nantes", "slug": "gdg-nantes"}),
            ),
        )
        .await;
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/api/teams/gdg-nantes/events",
                Some(&owner),
                json!({"name": "Devfest", "slug": "devfest", "type": "CONFERENCE"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/teams/gdg-nantes/events/devfest/api-key",
                Some(&owner),
                Value::Null,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let key = body["data"]["apiKey"].as_str().unwrap().to_string();

        let wrong = Request::get("/api/v1/event/devfest")
            .header(API_KEY_HEADER, "not-the-key")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, wrong).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let by_query = Request::get(format!("/api/v1/event/devfest?key={}", key))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, by_query).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "devfest");
    }
}
