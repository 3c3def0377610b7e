pub mod accounts;
pub mod coupons;
pub mod orders;
pub mod products;
