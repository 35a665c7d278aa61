use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;
use tracing::info;

use crate::{models::DEFAULT_CATEGORY_ID, Error};

// every post query joins `categories` so the templates can show the name
// without a second lookup.
const POST_COLUMNS: &str = "p.id, p.title, p.subtitle, p.body, p.can_comment, p.category_id, \
                            c.name AS category_name, p.created_at, p.updated_at";

#[derive(Debug, FromRow, Serialize)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub can_comment: bool,
    pub category_id: i32,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub async fn get_on_page(db: &sqlx::MySqlPool, page: u32, post_per_page: u32) -> Vec<Self> {
        sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts AS p
             INNER JOIN categories AS c ON p.category_id = c.id
             ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(post_per_page)
        .bind((page - 1) * post_per_page)
        .fetch_all(db)
        .await
        .unwrap_or_default()
    }

    pub async fn get_total_count(db: &sqlx::MySqlPool) -> i32 {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(db)
            .await
            .unwrap_or_default()
    }

    pub async fn get_by_category_on_page(
        db: &sqlx::MySqlPool,
        category_id: i32,
        page: u32,
        post_per_page: u32,
    ) -> Vec<Self> {
        sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts AS p
             INNER JOIN categories AS c ON p.category_id = c.id
             WHERE p.category_id = ?
             ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(category_id)
        .bind(post_per_page)
        .bind((page - 1) * post_per_page)
        .fetch_all(db)
        .await
        .unwrap_or_default()
    }

    pub async fn get_count_by_category(db: &sqlx::MySqlPool, category_id: i32) -> i32 {
        sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category_id = ?")
            .bind(category_id)
            .fetch_one(db)
            .await
            .unwrap_or_default()
    }

    pub async fn get_by_id(db: &sqlx::MySqlPool, id: i32) -> Option<Self> {
        sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM posts AS p
             INNER JOIN categories AS c ON p.category_id = c.id
             WHERE p.id = ?"
        ))
        .bind(id)
        .fetch_one(db)
        .await
        .ok()
    }

    // a missing category silently falls back to the default one, a post can
    // never point at nothing.
    async fn resolve_category(db: &sqlx::MySqlPool, category_id: i32) -> i32 {
        let exists: Option<i32> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_optional(db)
            .await
            .unwrap_or_default();
        exists.unwrap_or(DEFAULT_CATEGORY_ID)
    }

    pub async fn insert(
        db: &sqlx::MySqlPool,
        title: &str,
        subtitle: &str,
        body: &str,
        category_id: i32,
    ) -> Result<Self, Error> {
        let category_id = Self::resolve_category(db, category_id).await;

        let mut tx = db.begin().await?;

        sqlx::query(
            "INSERT INTO posts (title, subtitle, body, category_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, NOW(), NOW())",
        )
        .bind(title)
        .bind(subtitle)
        .bind(body)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        let id = sqlx::query_scalar::<_, u64>("SELECT LAST_INSERT_ID()")
            .fetch_one(&mut *tx)
            .await? as i32;

        tx.commit().await?;
        info!("inserted post <{}> with id {}", title, id);

        Ok(Self::get_by_id(db, id).await.unwrap())
    }

    pub async fn update(
        db: &sqlx::MySqlPool,
        id: i32,
        title: &str,
        subtitle: &str,
        body: &str,
        category_id: i32,
    ) -> Result<Self, Error> {
        let category_id = Self::resolve_category(db, category_id).await;

        sqlx::query(
            "UPDATE posts SET title = ?, subtitle = ?, body = ?, category_id = ?, updated_at = NOW()
             WHERE id = ?",
        )
        .bind(title)
        .bind(subtitle)
        .bind(body)
        .bind(category_id)
        .bind(id)
        .execute(db)
        .await?;
        info!("updated post <{}> with id {}", title, id);

        Self::get_by_id(db, id).await.ok_or(Error::Sqlx(sqlx::Error::RowNotFound))
    }

    // Deleting a post takes its whole comment section with it.
    pub async fn delete(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("deleted post {} and its comments", id);

        Ok(())
    }

    pub async fn toggle_comment(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE posts SET can_comment = NOT can_comment WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        info!("toggled the comment switch of post {}", id);
        Ok(())
    }
}
