use crate::entities::{coupon, user_account};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UseCouponRequest {
    pub email: String,
    pub code: String,
}

/// POST /api/users/coupon/use — redeems one coupon, returns what remains.
pub async fn use_coupon(
    State(state): State<AppState>,
    Json(req): Json<UseCouponRequest>,
) -> Result<Json<ApiResponse<Vec<coupon::Model>>>, ServiceError> {
    let remaining = state.services.coupons.redeem(&req.email, &req.code).await?;
    Ok(Json(ApiResponse::with_message(remaining, "Coupon redeemed")))
}

#[derive(Debug, Deserialize)]
pub struct AddCouponRequest {
    pub email: String,
    pub code: String,
    pub amount: i64,
    pub description: Option<String>,
}

/// POST /api/users/coupon/add — administrative grant.
pub async fn add_coupon(
    State(state): State<AppState>,
    Json(req): Json<AddCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<coupon::Model>>), ServiceError> {
    let description = req.description.unwrap_or_default();
    let granted = state
        .services
        .coupons
        .grant(&req.email, &req.code, req.amount, &description)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(granted))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: String,
    #[serde(default)]
    pub skin_type: String,
    #[serde(default)]
    pub hair_type: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub account: user_account::Model,
    pub coupons: Vec<coupon::Model>,
}

/// PUT /api/users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ServiceError> {
    let update = state
        .services
        .accounts
        .update_profile(&req.email, &req.skin_type, &req.hair_type)
        .await?;

    let message = if update.welcome_granted {
        "Profile updated, welcome coupon added"
    } else {
        "Profile updated"
    };

    Ok(Json(ApiResponse::with_message(
        ProfileResponse {
            account: update.account,
            coupons: update.coupons,
        },
        message,
    )))
}
