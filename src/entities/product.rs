use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product. Orders never reference these rows directly; line items
/// copy name and price at checkout so catalog edits stay prospective.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,
    pub category: String,
    pub price: i64,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
