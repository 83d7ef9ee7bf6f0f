use super::*;
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use tower::ServiceExt;

/// Service with one known user (7) and one known title ("Dune")
struct FixedService;

fn dune_sequel() -> Recommendation {
    Recommendation {
        isbn: "0441172695".to_string(),
        title: "Dune Messiah".to_string(),
        authors: "Frank Herbert".to_string(),
        description: "The sequel".to_string(),
        image_url: "https://images.example.com/messiah.jpg".to_string(),
        votes: 2,
    }
}

#[async_trait]
impl RecommendationService for FixedService {
    async fn recommend_for_user(&self, user_id: u32) -> Result<Vec<Recommendation>> {
        match user_id {
            7 => Ok(vec![dune_sequel()]),
            13 => Err(RecsError::Database("connection lost".to_string())),
            _ => Err(RecsError::NotFound(format!("No reading history for user {}", user_id))),
        }
    }

    async fn recommend_similar(&self, title: &str) -> Result<Vec<Recommendation>> {
        match title {
            "Dune" => Ok(vec![dune_sequel()]),
            "" => Err(RecsError::InvalidInput("Book title is empty".to_string())),
            other => Err(RecsError::NotFound(format!("No book titled '{}'", other))),
        }
    }

    fn max_user_id(&self) -> u32 {
        500
    }
}

fn app() -> Router {
    router(Arc::new(FixedService))
}

async fn get_request(uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request is valid"),
        )
        .await
        .expect("router never fails");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    (status, body.to_vec())
}

#[tokio::test]
async fn dashboard_is_served() {
    let (status, body) = get_request("/").await;

    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).expect("dashboard is utf-8");
    assert!(html.contains("Generate Book Recommendations"));
    assert!(html.contains("/api/recommend/collab/"));
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = get_request("/health").await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(value["status"], "ok");
}

#[tokio::test]
async fn info_exposes_user_range() {
    let (status, body) = get_request("/api/info").await;

    assert_eq!(status, StatusCode::OK);
    let info: InfoResponse = serde_json::from_slice(&body).expect("json body");
    assert_eq!(info.max_user_id, 500);
}

#[tokio::test]
async fn collaborative_recommendations_as_json() {
    let (status, body) = get_request("/api/recommend/collab/7").await;

    assert_eq!(status, StatusCode::OK);
    let response: RecommendationsResponse = serde_json::from_slice(&body).expect("json body");
    assert_eq!(response.recommendations, vec![dune_sequel()]);
}

#[tokio::test]
async fn unknown_user_is_404() {
    let (status, body) = get_request("/api/recommend/collab/8").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let value: serde_json::Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(value["status"], 404);
    assert!(value["error"].as_str().is_some_and(|e| e.contains("user 8")));
}

#[tokio::test]
async fn non_numeric_user_is_400() {
    let (status, _) = get_request("/api/recommend/collab/alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backend_failure_is_500() {
    let (status, _) = get_request("/api/recommend/collab/13").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn content_recommendations_by_title() {
    let (status, body) = get_request("/api/recommend/content?title=Dune").await;

    assert_eq!(status, StatusCode::OK);
    let response: RecommendationsResponse = serde_json::from_slice(&body).expect("json body");
    assert_eq!(response.recommendations.len(), 1);
}

#[tokio::test]
async fn content_errors_map_to_status() {
    let (missing, _) = get_request("/api/recommend/content?title=Middlemarch").await;
    let (empty, _) = get_request("/api/recommend/content").await;

    assert_eq!(missing, StatusCode::NOT_FOUND);
    assert_eq!(empty, StatusCode::BAD_REQUEST);
}
