//! Payment gateway handoff.
//!
//! Builds the signed parameter set an order needs to enter the gateway's
//! hosted checkout, and renders it as an auto-submitting form. Nothing in
//! this module mutates order state; reconciliation of the gateway's
//! asynchronous result lives in the callback handler.

pub mod signer;

use crate::config::GatewayConfig;
use crate::entities::order;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Positive acknowledgment body the gateway expects before it stops
/// retrying a callback.
pub const ACK_OK: &str = "1|OK";

/// Builds the negative acknowledgment for a rejected or failed callback.
pub fn nack(reason: &str) -> String {
    format!("0|{}", reason)
}

/// The signed field set and target URL for a gateway redirect.
#[derive(Debug, Clone)]
pub struct PaymentHandoff {
    pub action: String,
    pub fields: BTreeMap<String, String>,
}

/// Assembles the unsigned field set for an order's checkout.
///
/// `MerchantTradeNo` must be exactly the order id the store keys by; the
/// gateway's callback correlates on it.
pub fn checkout_fields(
    order: &order::Model,
    gateway: &GatewayConfig,
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("MerchantID".to_string(), gateway.merchant_id.clone());
    fields.insert("MerchantTradeNo".to_string(), order.order_id.clone());
    fields.insert("MerchantTradeDate".to_string(), format_trade_date(now));
    fields.insert("PaymentType".to_string(), "aio".to_string());
    fields.insert("TotalAmount".to_string(), order.total.to_string());
    fields.insert("TradeDesc".to_string(), gateway.trade_desc.clone());
    fields.insert("ItemName".to_string(), gateway.item_name.clone());
    fields.insert("ReturnURL".to_string(), gateway.return_url.clone());
    fields.insert(
        "ClientBackURL".to_string(),
        gateway.client_back_url.clone(),
    );
    fields.insert("ChoosePayment".to_string(), "ALL".to_string());
    fields.insert("EncryptType".to_string(), "1".to_string());
    fields
}

/// Builds the complete, signed handoff for an order.
pub fn build_handoff(
    order: &order::Model,
    gateway: &GatewayConfig,
    now: DateTime<Utc>,
) -> PaymentHandoff {
    let mut fields = checkout_fields(order, gateway, now);
    let mac = signer::check_mac_value(&fields, &gateway.hash_key, &gateway.hash_iv);
    fields.insert("CheckMacValue".to_string(), mac);

    PaymentHandoff {
        action: gateway.checkout_url.clone(),
        fields,
    }
}

/// Renders the handoff as an auto-submitting HTML form.
pub fn form_html(handoff: &PaymentHandoff) -> String {
    let inputs: String = handoff
        .fields
        .iter()
        .map(|(name, value)| {
            format!(
                r#"<input type="hidden" name="{}" value="{}" />"#,
                name, value
            )
        })
        .collect();

    format!(
        r#"<form id="gateway-form" action="{}" method="POST">{}</form><script>document.getElementById("gateway-form").submit();</script>"#,
        handoff.action, inputs
    )
}

/// Gateway trade date format: `YYYY/MM/DD HH:MM:SS`.
fn format_trade_date(now: DateTime<Utc>) -> String {
    now.format("%Y/%m/%d %H:%M:%S").to_string()
}
