//! Coupon ledger.
//!
//! A coupon row existing means the coupon is unredeemed. Redemption is a
//! single conditional delete keyed by the row id, so two concurrent attempts
//! on the same coupon settle with exactly one winner regardless of pool size.

use crate::entities::{coupon, user_account};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Atomically redeems a coupon on the given connection, which may be a
/// transaction. Returns the redeemed row so callers can apply its amount.
pub async fn redeem_on<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    code: &str,
) -> Result<coupon::Model, ServiceError> {
    let found = coupon::Entity::find()
        .filter(coupon::Column::UserId.eq(user_id))
        .filter(coupon::Column::Code.eq(code))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", code)))?;

    let deleted = coupon::Entity::delete_many()
        .filter(coupon::Column::Id.eq(found.id))
        .exec(conn)
        .await?;
    if deleted.rows_affected == 0 {
        // Lost the race to a concurrent redemption of the same row.
        return Err(ServiceError::Conflict(format!(
            "Coupon {} has already been redeemed",
            code
        )));
    }

    Ok(found)
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn account_by_email(&self, email: &str) -> Result<user_account::Model, ServiceError> {
        user_account::Entity::find()
            .filter(user_account::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", email)))
    }

    /// Lists a user's unredeemed coupons, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, email: &str) -> Result<Vec<coupon::Model>, ServiceError> {
        let account = self.account_by_email(email).await?;
        let coupons = coupon::Entity::find()
            .filter(coupon::Column::UserId.eq(account.user_id))
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(coupons)
    }

    /// Grants a new coupon to the account.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        email: &str,
        code: &str,
        amount: i64,
        description: &str,
    ) -> Result<coupon::Model, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::InvalidInput(
                "Coupon amount must be positive".to_string(),
            ));
        }

        let account = self.account_by_email(email).await?;
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(account.user_id.clone()),
            code: Set(code.to_string()),
            amount: Set(amount),
            description: Set(description.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CouponGranted {
                    user_id: account.user_id,
                    code: code.to_string(),
                    amount,
                })
                .await
            {
                warn!(error = %e, "failed to publish CouponGranted event");
            }
        }

        Ok(model)
    }

    /// Redeems one coupon and returns the coupons that remain.
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Vec<coupon::Model>, ServiceError> {
        let account = self.account_by_email(email).await?;
        redeem_on(&*self.db, &account.user_id, code).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CouponRedeemed {
                    user_id: account.user_id.clone(),
                    code: code.to_string(),
                })
                .await
            {
                warn!(error = %e, "failed to publish CouponRedeemed event");
            }
        }

        let remaining = coupon::Entity::find()
            .filter(coupon::Column::UserId.eq(account.user_id))
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(remaining)
    }
}
