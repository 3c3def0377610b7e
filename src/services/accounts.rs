//! Account profiles.
//!
//! The interesting part is the welcome bonus: the first time a profile goes
//! from fully empty to non-empty, the account is granted a one-time coupon.
//! The first-time guard is a conditional update on the empty-profile state,
//! so two concurrent profile submissions grant at most one coupon.

use crate::entities::{coupon, user_account};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const WELCOME_COUPON_CODE: &str = "WELCOME100";
pub const WELCOME_COUPON_AMOUNT: i64 = 100;
pub const WELCOME_COUPON_DESCRIPTION: &str = "Welcome gift for completing your profile";

/// Result of a profile update, including whether this call was the one that
/// triggered the welcome grant.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub account: user_account::Model,
    pub coupons: Vec<coupon::Model>,
    pub welcome_granted: bool,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    event_sender: Option<EventSender>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<user_account::Model, ServiceError> {
        user_account::Entity::find()
            .filter(user_account::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", email)))
    }

    /// Creates an account with an empty profile.
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        email: &str,
        name: &str,
    ) -> Result<user_account::Model, ServiceError> {
        if email.is_empty() {
            return Err(ServiceError::InvalidInput("Email is required".to_string()));
        }

        let existing = user_account::Entity::find()
            .filter(user_account::Column::Email.eq(email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Account {} already exists",
                email
            )));
        }

        let account = user_account::ActiveModel {
            user_id: Set(format!("USR{}", Uuid::new_v4().simple())),
            email: Set(email.to_string()),
            name: Set(name.to_string()),
            skin_type: Set(String::new()),
            hair_type: Set(String::new()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        Ok(account)
    }

    /// Updates the profile fields, granting the welcome coupon if this is the
    /// first transition away from an empty profile.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        email: &str,
        skin_type: &str,
        hair_type: &str,
    ) -> Result<ProfileUpdate, ServiceError> {
        let account = self.find_by_email(email).await?;
        let fills_profile = !(skin_type.is_empty() && hair_type.is_empty());

        let mut welcome_granted = false;
        if fills_profile {
            // The empty-profile filter is the one-time guard. If another
            // request already filled the profile, zero rows match and no
            // second coupon is granted.
            let guarded = user_account::Entity::update_many()
                .col_expr(user_account::Column::SkinType, Expr::value(skin_type))
                .col_expr(user_account::Column::HairType, Expr::value(hair_type))
                .filter(user_account::Column::UserId.eq(&account.user_id))
                .filter(user_account::Column::SkinType.eq(""))
                .filter(user_account::Column::HairType.eq(""))
                .exec(&*self.db)
                .await?;

            if guarded.rows_affected == 1 {
                welcome_granted = true;
                coupon::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(account.user_id.clone()),
                    code: Set(WELCOME_COUPON_CODE.to_string()),
                    amount: Set(WELCOME_COUPON_AMOUNT),
                    description: Set(WELCOME_COUPON_DESCRIPTION.to_string()),
                    created_at: Set(Utc::now()),
                }
                .insert(&*self.db)
                .await?;

                info!(user_id = %account.user_id, "welcome coupon granted");
                if let Some(sender) = &self.event_sender {
                    if let Err(e) = sender
                        .send(Event::CouponGranted {
                            user_id: account.user_id.clone(),
                            code: WELCOME_COUPON_CODE.to_string(),
                            amount: WELCOME_COUPON_AMOUNT,
                        })
                        .await
                    {
                        warn!(error = %e, "failed to publish CouponGranted event");
                    }
                }
            }
        }

        if !welcome_granted {
            user_account::Entity::update_many()
                .col_expr(user_account::Column::SkinType, Expr::value(skin_type))
                .col_expr(user_account::Column::HairType, Expr::value(hair_type))
                .filter(user_account::Column::UserId.eq(&account.user_id))
                .exec(&*self.db)
                .await?;
        }

        let account = self.find_by_email(email).await?;
        let coupons = coupon::Entity::find()
            .filter(coupon::Column::UserId.eq(&account.user_id))
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(ProfileUpdate {
            account,
            coupons,
            welcome_granted,
        })
    }
}
