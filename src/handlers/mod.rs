pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use crate::events::EventSender;
use crate::services::accounts::AccountService;
use crate::services::coupons::CouponService;
use crate::services::orders::OrderService;
use crate::services::products::ProductService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Service container shared across handlers via `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub coupons: Arc<CouponService>,
    pub accounts: Arc<AccountService>,
    pub products: Arc<ProductService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Option<EventSender>) -> Self {
        Self {
            orders: Arc::new(OrderService::new(db.clone(), event_sender.clone())),
            coupons: Arc::new(CouponService::new(db.clone(), event_sender.clone())),
            accounts: Arc::new(AccountService::new(db.clone(), event_sender)),
            products: Arc::new(ProductService::new(db)),
        }
    }
}
