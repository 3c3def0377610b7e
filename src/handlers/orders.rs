use crate::entities::order::{self, OrderStatus};
use crate::errors::ServiceError;
use crate::services::orders::{CreateOrderInput, OrderDetails};
use crate::{ApiResponse, AppState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order_id: String,
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedOrder>>), ServiceError> {
    let details = state.services.orders.create_order(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedOrder {
            order_id: details.order.order_id,
        })),
    ))
}

/// GET /api/orders/:id — the caller's email, orders newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<Vec<OrderDetails>>>, ServiceError> {
    let orders = state.services.orders.list_by_email(&email).await?;
    Ok(Json(ApiResponse::success(orders)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// PUT /api/orders/:id/status — fulfillment transitions only.
pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, ServiceError> {
    let target = OrderStatus::parse(&req.status)
        .ok_or_else(|| ServiceError::InvalidStatus(format!("Unknown status {}", req.status)))?;
    let updated = state
        .services
        .orders
        .advance_status(&order_id, target)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}
