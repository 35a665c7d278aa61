use serde::Serialize;
use sqlx::prelude::FromRow;
use tracing::info;

use crate::Error;

#[derive(Clone, Debug, FromRow, Serialize)]
pub struct Link {
    pub id: i32,
    pub name: String,
    pub url: String,
}

impl Link {
    pub async fn get_all(db: &sqlx::MySqlPool) -> Vec<Self> {
        sqlx::query_as("SELECT id, name, url FROM links ORDER BY name ASC")
            .fetch_all(db)
            .await
            .unwrap_or_default()
    }

    pub async fn get_by_id(db: &sqlx::MySqlPool, id: i32) -> Option<Self> {
        sqlx::query_as("SELECT id, name, url FROM links WHERE id = ?")
            .bind(id)
            .fetch_one(db)
            .await
            .ok()
    }

    pub async fn get_total_count(db: &sqlx::MySqlPool) -> i32 {
        sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(db)
            .await
            .unwrap_or_default()
    }

    pub async fn insert(db: &sqlx::MySqlPool, name: &str, url: &str) -> Result<(), Error> {
        sqlx::query("INSERT INTO links (name, url) VALUES (?, ?)")
            .bind(name)
            .bind(url)
            .execute(db)
            .await?;
        info!("inserted link <{}> pointing at {}", name, url);
        Ok(())
    }

    pub async fn update(db: &sqlx::MySqlPool, id: i32, name: &str, url: &str) -> Result<(), Error> {
        sqlx::query("UPDATE links SET name = ?, url = ? WHERE id = ?")
            .bind(name)
            .bind(url)
            .bind(id)
            .execute(db)
            .await?;
        info!("updated link {}", id);
        Ok(())
    }

    pub async fn delete(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        sqlx::query("DELETE FROM links WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        info!("deleted link {}", id);
        Ok(())
    }
}
