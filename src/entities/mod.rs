pub mod coupon;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user_account;
