//! HTTP API.
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | GET | `/` | |
//! | POST | `/extract-colors/` | `{"image_paths": [..]}` |
//! | POST | `/generate-product-name/` | `{"image_paths": [..]}` |
//! | POST | `/generate-description/` | `{"image_paths": [..], "product_name": "..", "colors": [..]?}` |

mod error;
mod extract;
mod handlers;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use prism_core::Prism;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use error::ApiError;

/// Build the application router.
pub fn router(prism: Arc<Prism>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/extract-colors/", post(handlers::extract_colors))
        .route("/extract-colors", post(handlers::extract_colors))
        .route(
            "/generate-product-name/",
            post(handlers::generate_product_name),
        )
        .route(
            "/generate-product-name",
            post(handlers::generate_product_name),
        )
        .route(
            "/generate-description/",
            post(handlers::generate_description),
        )
        .route("/generate-description", post(handlers::generate_description))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(prism)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Panic(detail).into_response()
}

/// Serve until Ctrl-C or SIGTERM, letting in-flight requests finish.
pub async fn run(prism: Arc<Prism>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(prism))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining requests");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use prism_core::caption::{FeatureEncoder, StepPredictor, Vocabulary};
    use prism_core::color::BackgroundRemover;
    use prism_core::llm::{LlmRequest, LlmResponse};
    use prism_core::{
        CaptionEngine, ColorExtractor, Config, LlmProvider, PipelineError, PipelineResult,
    };
    use serde_json::{json, Value};
    use std::path::Path;
    use std::time::Duration;
    use tower::ServiceExt;

    struct ConstantEncoder;

    impl FeatureEncoder for ConstantEncoder {
        fn encode(&self, _: &DynamicImage, _: &Path) -> PipelineResult<Vec<f32>> {
            Ok(vec![0.5; 4])
        }
    }

    /// "canvas tote" then the end token.
    struct TotePredictor;

    impl StepPredictor for TotePredictor {
        fn predict(&self, _: &[f32], sequence: &[u32]) -> PipelineResult<Vec<f32>> {
            let filled = sequence.iter().filter(|&&id| id != 0).count();
            let next = [3, 4, 2][(filled - 1).min(2)];
            let mut dist = vec![0.0; 5];
            dist[next] = 1.0;
            Ok(dist)
        }
    }

    struct FullMask;

    impl BackgroundRemover for FullMask {
        fn foreground_mask(&self, image: &RgbImage, _: &Path) -> PipelineResult<GrayImage> {
            Ok(GrayImage::from_pixel(
                image.width(),
                image.height(),
                Luma([255]),
            ))
        }
    }

    /// Replies with the first line of the prompt, or fails when `fail` is set.
    struct StubProvider {
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, request: &LlmRequest) -> PipelineResult<LlmResponse> {
            if self.fail {
                return Err(PipelineError::Llm {
                    message: "HTTP 401 Unauthorized".to_string(),
                    status_code: Some(401),
                });
            }
            Ok(LlmResponse {
                text: format!("reply to: {}", request.prompt.lines().next().unwrap_or("")),
                model: "stub".to_string(),
                tokens_used: None,
                latency_ms: 0,
            })
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn app(llm_fails: bool) -> Router {
        let mut config = Config::default();
        config.llm.retry_attempts = 0;
        let vocabulary = Vocabulary::from_entries(
            [("startseq", 1), ("endseq", 2), ("canvas", 3), ("tote", 4)],
            "startseq",
            "endseq",
        )
        .unwrap();
        let captioner = CaptionEngine::new(
            Box::new(ConstantEncoder),
            Box::new(TotePredictor),
            vocabulary,
            config.caption.max_length,
        );
        let colors = ColorExtractor::new(Box::new(FullMask), config.color.clone());
        let prism = Prism::from_parts(
            config,
            captioner,
            colors,
            Arc::new(StubProvider { fail: llm_fails }),
        );
        router(Arc::new(prism))
    }

    async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn save(dir: &Path, name: &str, image: RgbImage) -> String {
        let path = dir.join(name);
        image.save(&path).unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_root_greeting() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(app(false), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Hello from our API" }));
    }

    #[tokio::test]
    async fn test_empty_list_is_400_on_every_endpoint() {
        let cases = [
            ("/extract-colors/", json!({ "image_paths": [] })),
            ("/generate-product-name/", json!({ "image_paths": [] })),
            (
                "/generate-description/",
                json!({ "image_paths": [], "product_name": "Tote" }),
            ),
        ];
        for (uri, body) in cases {
            let (status, body) = post(app(false), uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], false);
            assert_eq!(body["code"], 400);
            assert_eq!(body["message"], "The image list cannot be empty.");
            assert_eq!(body["error"], "EmptyImageList");
        }
    }

    #[tokio::test]
    async fn test_missing_path_is_400() {
        let (status, body) = post(
            app(false),
            "/generate-product-name/",
            json!({ "image_paths": ["/no/such/file.jpg"] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "There is no file found at path: /no/such/file.jpg"
        );
    }

    #[tokio::test]
    async fn test_invalid_image_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.jpg");
        std::fs::write(&path, "hello").unwrap();
        let path = path.to_string_lossy().to_string();

        let (status, body) =
            post(app(false), "/extract-colors/", json!({ "image_paths": [path] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            format!("The file at path {path} is not a valid image.")
        );
    }

    #[tokio::test]
    async fn test_extract_colors_reports_null_for_failures() {
        let dir = tempfile::tempdir().unwrap();
        let tan = save(dir.path(), "tan.png", RgbImage::from_pixel(5, 5, Rgb([190, 124, 96])));
        let black = save(dir.path(), "black.png", RgbImage::new(5, 5));

        let (status, body) = post(
            app(false),
            "/extract-colors/",
            json!({ "image_paths": [tan, black] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "colors": ["#be7c60", null] }));
    }

    #[tokio::test]
    async fn test_generate_product_name() {
        let dir = tempfile::tempdir().unwrap();
        let bag = save(dir.path(), "bag.png", RgbImage::new(4, 4));

        let (status, body) = post(
            app(false),
            "/generate-product-name/",
            json!({ "image_paths": [bag] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let name = body["product_name"].as_str().unwrap();
        assert!(name.starts_with("reply to: Generate a product title name based on the caption canvas tote"));
    }

    #[tokio::test]
    async fn test_generate_description_with_optional_colors() {
        let dir = tempfile::tempdir().unwrap();
        let bag = save(dir.path(), "bag.png", RgbImage::new(4, 4));

        for colors in [json!(null), json!(["#be7c60"])] {
            let (status, body) = post(
                app(false),
                "/generate-description/",
                json!({ "image_paths": [bag], "product_name": "Tote", "colors": colors }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert!(body["description"].as_str().unwrap().starts_with("reply to: "));
        }
    }

    #[tokio::test]
    async fn test_llm_failure_is_500_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let bag = save(dir.path(), "bag.png", RgbImage::new(4, 4));

        let (status, body) = post(
            app(true),
            "/generate-product-name/",
            json!({ "image_paths": [bag] }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An unexpected error occurred.");
        assert_eq!(body["code"], 500);
        assert!(body["error"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn test_missing_field_is_422() {
        let (status, body) = post(
            app(false),
            "/generate-description/",
            json!({ "image_paths": ["/tmp/a.jpg"] }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 422);
        assert_eq!(body["message"], "Validation error occurred.");
        assert_eq!(body["error"][0]["loc"], json!(["body", "product_name"]));
        assert_eq!(body["error"][0]["type"], "missing");
    }

    #[tokio::test]
    async fn test_malformed_json_and_wrong_content_type_are_422() {
        let request = Request::builder()
            .method("POST")
            .uri("/extract-colors/")
            .header("content-type", "application/json")
            .body(Body::from("{\"image_paths\": ["))
            .unwrap();
        let (status, body) = send(app(false), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"][0]["type"], "json_invalid");

        let request = Request::builder()
            .method("POST")
            .uri("/extract-colors/")
            .header("content-type", "text/plain")
            .body(Body::from("{\"image_paths\": []}"))
            .unwrap();
        let (status, _) = send(app(false), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404_envelope() {
        let request = Request::builder()
            .uri("/does-not-exist")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(false), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_envelope() {
        let request = Request::builder()
            .method("GET")
            .uri("/extract-colors/")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(false), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], 405);
        assert_eq!(body["message"], "Method Not Allowed");
    }
}
