use crate::entities::product;
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<product::Model>>>, ServiceError> {
    let products = state.services.products.list().await?;
    Ok(Json(ApiResponse::success(products)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), ServiceError> {
    let created = state
        .services
        .products
        .create(product::Model {
            id: req.id,
            name: req.name,
            category: req.category,
            price: req.price,
            description: req.description,
            image: req.image,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub price: i64,
}

/// PUT /api/products/:id
pub async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePriceRequest>,
) -> Result<Json<ApiResponse<product::Model>>, ServiceError> {
    let updated = state.services.products.update_price(&id, req.price).await?;
    Ok(Json(ApiResponse::success(updated)))
}
