use serde::Serialize;
use sqlx::prelude::FromRow;
use tracing::info;

use crate::{models::DEFAULT_CATEGORY_ID, Error};

#[derive(Clone, Debug, FromRow, Serialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

impl Category {
    pub async fn get_all(db: &sqlx::MySqlPool) -> Vec<Self> {
        sqlx::query_as("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(db)
            .await
            .unwrap_or_default()
    }

    pub async fn get_by_id(db: &sqlx::MySqlPool, id: i32) -> Option<Self> {
        sqlx::query_as("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(db)
            .await
            .ok()
    }

    pub async fn get_total_count(db: &sqlx::MySqlPool) -> i32 {
        sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(db)
            .await
            .unwrap_or_default()
    }

    async fn check_name_exists(
        db: &mut sqlx::MySqlConnection,
        name: &str,
    ) -> Result<Option<i32>, Error> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM categories WHERE name = ?")
            .bind(name)
            .fetch_optional(db)
            .await
            .map_err(|e| e.into())
    }

    pub async fn insert(db: &sqlx::MySqlPool, name: &str) -> Result<Self, Error> {
        let mut tx = db.begin().await?;

        // category names are unique.
        if Category::check_name_exists(&mut tx, name).await?.is_some() {
            return Err(Error::CategoryNameExists(name.to_string()));
        }

        sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&mut *tx)
            .await?;
        let id = sqlx::query_scalar::<_, u64>("SELECT LAST_INSERT_ID()")
            .fetch_one(&mut *tx)
            .await? as i32;

        tx.commit().await?;
        info!("inserted category <{}> with id {}", name, id);

        Ok(Self {
            id,
            name: name.to_string(),
        })
    }

    pub async fn update(db: &sqlx::MySqlPool, id: i32, name: &str) -> Result<(), Error> {
        if id == DEFAULT_CATEGORY_ID {
            return Err(Error::DefaultCategoryProtected);
        }

        let mut tx = db.begin().await?;

        if let Some(id_exists) = Category::check_name_exists(&mut tx, name).await? {
            if id_exists != id {
                return Err(Error::CategoryNameExists(name.to_string()));
            }
        }

        sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("renamed category {} to <{}>", id, name);

        Ok(())
    }

    // Deleting a category never orphans a post: everything it held is moved to
    // the default category first.
    pub async fn delete(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        if id == DEFAULT_CATEGORY_ID {
            return Err(Error::DefaultCategoryProtected);
        }

        let mut tx = db.begin().await?;

        sqlx::query("UPDATE posts SET category_id = ? WHERE category_id = ?")
            .bind(DEFAULT_CATEGORY_ID)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("deleted category {}, its posts fell back to the default one", id);

        Ok(())
    }
}
