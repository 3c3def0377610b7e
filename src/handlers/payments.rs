//! Gateway-facing endpoints.
//!
//! `checkout` emits the signed auto-submitting form; `payment_return` is the
//! server-to-server callback reconciler. The reconciler always answers 200
//! with the gateway's ack grammar (`1|OK` / `0|<reason>`), even for internal
//! failures, because anything else makes the gateway retry forever.

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::payment::{self, signer, ACK_OK};
use crate::services::orders::PaidOutcome;
use crate::AppState;
use axum::extract::State;
use axum::response::Html;
use axum::{Form, Json};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: String,
}

/// POST /api/payment/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Html<String>, ServiceError> {
    let details = state.services.orders.find_by_order_id(&req.order_id).await?;
    if OrderStatus::parse(&details.order.status) != Some(OrderStatus::Pending) {
        return Err(ServiceError::Conflict(format!(
            "Order {} is not awaiting payment",
            req.order_id
        )));
    }

    let handoff = payment::build_handoff(&details.order, &state.config.gateway, Utc::now());
    Ok(Html(payment::form_html(&handoff)))
}

/// POST /api/payment/return
///
/// Never fails at the HTTP level: every outcome, including internal errors,
/// maps to a 200 with an ack body the gateway understands.
pub async fn payment_return(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> String {
    let gateway = &state.config.gateway;
    if !signer::verify_callback(params.iter(), &gateway.hash_key, &gateway.hash_iv) {
        warn!("payment callback rejected: CheckMacValue mismatch or missing");
        return payment::nack("CheckMacValueError");
    }

    let Some(order_id) = params.get("MerchantTradeNo") else {
        warn!("payment callback rejected: no MerchantTradeNo");
        return payment::nack("MissingMerchantTradeNo");
    };

    let rtn_code = params.get("RtnCode").map(String::as_str).unwrap_or("");
    if rtn_code != "1" {
        info!(order_id = %order_id, rtn_code = %rtn_code, "payment callback reported failure");
        return payment::nack("PaymentFailed");
    }

    match state.services.orders.mark_paid(order_id).await {
        Ok(PaidOutcome::Marked) => ACK_OK.to_string(),
        Ok(PaidOutcome::AlreadyPaid) => {
            info!(order_id = %order_id, "duplicate payment callback ignored");
            ACK_OK.to_string()
        }
        Err(ServiceError::NotFound(_)) => {
            warn!(order_id = %order_id, "payment callback for unknown order");
            payment::nack("OrderNotFound")
        }
        Err(e) => {
            error!(order_id = %order_id, error = %e, "payment callback failed internally");
            payment::nack("Error")
        }
    }
}
