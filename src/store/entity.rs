//! `clients` table entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted per-client quota row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    /// Client identifier (primary key).
    #[sea_orm(primary_key, auto_increment = false)]
    pub client_id: String,

    /// Maximum token count.
    pub capacity: i32,

    /// Refill rate in tokens per second.
    pub rate_per_sec: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
