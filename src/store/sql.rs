//! SQL-backed client store (sea-orm, PostgreSQL).

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, Set,
};
use tracing::{debug, info};

use crate::error::Error;
use crate::store::entity::{self, Entity as Clients};
use crate::store::{ClientConfig, ClientStore};

/// Client store backed by the `clients` table.
pub struct SqlClientStore {
    db: DatabaseConnection,
}

impl SqlClientStore {
    /// Connect and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let mut opts = ConnectOptions::new(database_url.to_string());
        opts.max_connections(10)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(10));

        let db = Database::connect(opts).await?;
        info!("Database connection established");

        db.execute_unprepared(
            "CREATE TABLE IF NOT EXISTS clients (
                client_id TEXT PRIMARY KEY,
                capacity INTEGER NOT NULL,
                rate_per_sec DOUBLE PRECISION NOT NULL
            )",
        )
        .await?;

        Ok(Self { db })
    }
}

impl entity::Model {
    fn into_config(self) -> ClientConfig {
        ClientConfig {
            client_id: self.client_id,
            capacity: self.capacity.max(0) as u32,
            rate_per_sec: self.rate_per_sec,
        }
    }
}

fn active_model(config: &ClientConfig) -> entity::ActiveModel {
    entity::ActiveModel {
        client_id: Set(config.client_id.clone()),
        capacity: Set(config.capacity as i32),
        rate_per_sec: Set(config.rate_per_sec),
    }
}

#[async_trait]
impl ClientStore for SqlClientStore {
    async fn load_all(&self) -> Result<Vec<ClientConfig>, Error> {
        let rows = Clients::find().all(&self.db).await?;
        info!(count = rows.len(), "Loaded clients from store");
        Ok(rows.into_iter().map(entity::Model::into_config).collect())
    }

    async fn insert(&self, config: &ClientConfig) -> Result<(), Error> {
        debug!(client_id = %config.client_id, "Inserting client row");
        active_model(config).insert(&self.db).await?;
        Ok(())
    }

    async fn update(&self, config: &ClientConfig) -> Result<(), Error> {
        debug!(client_id = %config.client_id, "Upserting client row");
        Clients::insert(active_model(config))
            .on_conflict(
                OnConflict::column(entity::Column::ClientId)
                    .update_columns([entity::Column::Capacity, entity::Column::RatePerSec])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete(&self, client_id: &str) -> Result<(), Error> {
        debug!(client_id = %client_id, "Deleting client row");
        Clients::delete_many()
            .filter(entity::Column::ClientId.eq(client_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
