//! Route handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::Json;
use prism_core::Prism;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::extract::ValidJson;

/// Body of `/extract-colors/` and `/generate-product-name/`.
#[derive(Debug, Deserialize)]
pub struct ImagesRequest {
    pub image_paths: Vec<String>,
}

/// Body of `/generate-description/`.
#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub image_paths: Vec<String>,
    pub product_name: String,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ColorsResponse {
    pub success: bool,
    /// Dominant hex color per input image, `null` where extraction failed
    pub colors: Vec<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct ProductNameResponse {
    pub success: bool,
    pub product_name: String,
}

#[derive(Debug, Serialize)]
pub struct DescriptionResponse {
    pub success: bool,
    pub description: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello from our API" }))
}

pub async fn extract_colors(
    State(prism): State<Arc<Prism>>,
    ValidJson(request): ValidJson<ImagesRequest>,
) -> Result<Json<ColorsResponse>, ApiError> {
    let outcomes = prism.extract_colors(&request.image_paths).await?;
    let colors = outcomes
        .iter()
        .map(|o| o.dominant_hex().map(str::to_string))
        .collect();
    Ok(Json(ColorsResponse {
        success: true,
        colors,
    }))
}

pub async fn generate_product_name(
    State(prism): State<Arc<Prism>>,
    ValidJson(request): ValidJson<ImagesRequest>,
) -> Result<Json<ProductNameResponse>, ApiError> {
    let product_name = prism.generate_product_name(&request.image_paths).await?;
    Ok(Json(ProductNameResponse {
        success: true,
        product_name,
    }))
}

pub async fn generate_description(
    State(prism): State<Arc<Prism>>,
    ValidJson(request): ValidJson<DescriptionRequest>,
) -> Result<Json<DescriptionResponse>, ApiError> {
    let description = prism
        .generate_description(
            &request.image_paths,
            &request.product_name,
            request.colors.as_deref(),
        )
        .await?;
    Ok(Json(DescriptionResponse {
        success: true,
        description,
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
