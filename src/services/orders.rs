//! Order creation and lifecycle.
//!
//! This service is the only writer of order rows. Creation snapshots the
//! catalog into frozen line items, reprices the cart server-side, and redeems
//! any named coupon inside the same transaction; after commit only the status
//! column and its timestamps ever change, through single conditional updates.

use crate::entities::order::OrderStatus;
use crate::entities::{coupon, order, order_item, product, user_account};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::pricing::{price_cart, CartLine};
use crate::services::coupons::redeem_on;
use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// One requested line of a new order. Prices are never taken from the
/// client; only the product reference and quantity are.
#[derive(Debug, Clone, serde::Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,

    #[validate(length(min = 1, message = "Recipient last name is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Recipient first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    /// Redeemed atomically inside the creation transaction when present.
    pub coupon_code: Option<String>,

    /// The total the client displayed at checkout. When present it must match
    /// the server-side recomputation exactly.
    pub expected_total: Option<i64>,
}

/// An order together with its frozen line items.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Result of a payment reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidOutcome {
    /// This call transitioned the order from pending to paid.
    Marked,
    /// The order was already past pending; nothing changed.
    AlreadyPaid,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a priced, pending order from a cart snapshot.
    ///
    /// Everything money-related is decided here: catalog prices are read
    /// inside the transaction, the coupon (if any) is redeemed in the same
    /// transaction, and the totals are recomputed server-side. A client total
    /// that disagrees with the recomputation rejects the whole request.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_order(
        &self,
        input: CreateOrderInput,
    ) -> Result<OrderDetails, ServiceError> {
        input.validate()?;
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be positive",
                    item.product_id
                )));
            }
        }

        let txn = self.db.begin().await?;

        let account = user_account::Entity::find()
            .filter(user_account::Column::Email.eq(&input.email))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", input.email)))?;

        let mut lines = Vec::with_capacity(input.items.len());
        let mut frozen = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = product::Entity::find_by_id(&item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            lines.push(CartLine {
                unit_price: product.price,
                quantity: i64::from(item.quantity),
            });
            frozen.push((product, item.quantity));
        }

        let redeemed: Option<coupon::Model> = match &input.coupon_code {
            Some(code) => Some(redeem_on(&txn, &account.user_id, code).await?),
            None => None,
        };

        let pricing = price_cart(&lines, redeemed.as_ref().map(|c| c.amount));
        if let Some(expected) = input.expected_total {
            if expected != pricing.total {
                return Err(ServiceError::ValidationError(format!(
                    "Submitted total {} does not match the priced total {}",
                    expected, pricing.total
                )));
            }
        }

        let order_id = generate_order_id();
        let now = Utc::now();

        let order_model = order::ActiveModel {
            order_id: Set(order_id.clone()),
            user_id: Set(account.user_id.clone()),
            user_email: Set(account.email.clone()),
            subtotal: Set(pricing.subtotal),
            discount: Set(pricing.discount),
            shipping_fee: Set(pricing.shipping_fee),
            total: Set(pricing.total),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            recipient_last_name: Set(input.last_name.clone()),
            recipient_first_name: Set(input.first_name.clone()),
            phone: Set(input.phone.clone()),
            city: Set(input.city.clone()),
            address: Set(input.address.clone()),
            payment_method: Set(input.payment_method.clone()),
            created_at: Set(now),
            paid_at: Set(None),
            shipped_at: Set(None),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(frozen.len());
        for (product, quantity) in frozen {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id.clone()),
                product_id: Set(product.id),
                name: Set(product.name),
                unit_price: Set(product.price),
                quantity: Set(quantity),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;

        info!(order_id = %order_id, total = pricing.total, "order created");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderCreated {
                    order_id: order_id.clone(),
                    user_email: account.email.clone(),
                    total: pricing.total,
                })
                .await
            {
                warn!(error = %e, "failed to publish OrderCreated event");
            }
            if let Some(coupon) = &redeemed {
                if let Err(e) = sender
                    .send(Event::CouponRedeemed {
                        user_id: account.user_id.clone(),
                        code: coupon.code.clone(),
                    })
                    .await
                {
                    warn!(error = %e, "failed to publish CouponRedeemed event");
                }
            }
        }

        Ok(OrderDetails {
            order: order_model,
            items,
        })
    }

    #[instrument(skip(self))]
    pub async fn find_by_order_id(&self, order_id: &str) -> Result<OrderDetails, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderDetails { order, items })
    }

    /// Lists an account's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<OrderDetails>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::UserEmail.eq(email))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(&order.order_id))
                .all(&*self.db)
                .await?;
            details.push(OrderDetails { order, items });
        }
        Ok(details)
    }

    /// Transitions a pending order to paid.
    ///
    /// The pending-status filter makes the operation idempotent: replayed
    /// callbacks find zero matching rows and report `AlreadyPaid` instead of
    /// stamping a second payment time.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: &str) -> Result<PaidOutcome, ServiceError> {
        let updated = order::Entity::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(OrderStatus::Paid.as_str()),
            )
            .col_expr(order::Column::PaidAt, Expr::value(Some(Utc::now())))
            .filter(order::Column::OrderId.eq(order_id))
            .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
            .exec(&*self.db)
            .await?;

        if updated.rows_affected == 1 {
            info!(order_id = %order_id, "order marked paid");
            if let Some(sender) = &self.event_sender {
                if let Err(e) = sender
                    .send(Event::OrderPaid {
                        order_id: order_id.to_string(),
                    })
                    .await
                {
                    warn!(error = %e, "failed to publish OrderPaid event");
                }
            }
            return Ok(PaidOutcome::Marked);
        }

        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        match OrderStatus::parse(&existing.status) {
            Some(OrderStatus::Paid) | Some(OrderStatus::Shipping)
            | Some(OrderStatus::Completed) => Ok(PaidOutcome::AlreadyPaid),
            _ => Err(ServiceError::InvalidStatus(format!(
                "Order {} is in unexpected status {}",
                order_id, existing.status
            ))),
        }
    }

    /// Advances a paid order along the fulfillment states.
    ///
    /// Only `paid -> shipping` and `shipping -> completed` are legal here;
    /// payment itself goes through `mark_paid`.
    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let (required, timestamp_col) = match target {
            OrderStatus::Shipping => (OrderStatus::Paid, order::Column::ShippedAt),
            OrderStatus::Completed => (OrderStatus::Shipping, order::Column::CompletedAt),
            other => {
                return Err(ServiceError::InvalidStatus(format!(
                    "Cannot transition an order to {} through this operation",
                    other
                )))
            }
        };

        let updated = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(target.as_str()))
            .col_expr(timestamp_col, Expr::value(Some(Utc::now())))
            .filter(order::Column::OrderId.eq(order_id))
            .filter(order::Column::Status.eq(required.as_str()))
            .exec(&*self.db)
            .await?;

        let existing = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if updated.rows_affected == 0 {
            return Err(ServiceError::InvalidStatus(format!(
                "Order {} is {}, expected {}",
                order_id, existing.status, required
            )));
        }

        Ok(existing)
    }
}

/// Merchant trade numbers: `ORD` + creation millis + a random 4-digit suffix.
fn generate_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD{}{:04}", millis, suffix)
}
