use serde::Serialize;
use sqlx::prelude::FromRow;
use tracing::info;

// The single blog owner account. The profile fields double as the blog
// settings shown on every page.
#[derive(Clone, Debug, FromRow, Serialize)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub blog_title: String,
    pub blog_sub_title: String,
    pub name: String,
    pub about: String,
}

impl Admin {
    pub async fn get(db: &sqlx::MySqlPool) -> Option<Self> {
        sqlx::query_as("SELECT id, username, password, blog_title, blog_sub_title, name, about FROM admins ORDER BY id LIMIT 1")
            .fetch_one(db)
            .await
            .ok()
    }

    pub async fn get_by_username(db: &sqlx::MySqlPool, username: &str) -> Option<Self> {
        sqlx::query_as("SELECT id, username, password, blog_title, blog_sub_title, name, about FROM admins WHERE username = ?")
            .bind(username)
            .fetch_one(db)
            .await
            .ok()
    }

    // Create the admin account, or refresh the credentials if it already exists.
    pub async fn upsert(
        db: &sqlx::MySqlPool,
        username: &str,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        match Self::get(db).await {
            Some(admin) => {
                sqlx::query("UPDATE admins SET username = ?, password = ? WHERE id = ?")
                    .bind(username)
                    .bind(password_hash)
                    .bind(admin.id)
                    .execute(db)
                    .await?;
                info!("updated the credentials of the existing admin account");
            }
            None => {
                sqlx::query(
                    "INSERT INTO admins (username, password, blog_title, blog_sub_title, name, about)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(username)
                .bind(password_hash)
                .bind("BreakBlog")
                .bind("You still have lots more to work on!")
                .bind(username)
                .bind("Hello World!")
                .execute(db)
                .await?;
                info!("created the admin account {}", username);
            }
        }
        Ok(())
    }

    pub async fn update_profile(
        db: &sqlx::MySqlPool,
        name: &str,
        blog_title: &str,
        blog_sub_title: &str,
        about: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE admins SET name = ?, blog_title = ?, blog_sub_title = ?, about = ?",
        )
        .bind(name)
        .bind(blog_title)
        .bind(blog_sub_title)
        .bind(about)
        .execute(db)
        .await?;
        info!("updated the blog settings");
        Ok(())
    }

    pub async fn modify_password(
        db: &sqlx::MySqlPool,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE admins SET password = ? WHERE username = ? AND password = ?")
            .bind(new_password)
            .bind(username)
            .bind(old_password)
            .execute(db)
            .await?;
        Ok(())
    }
}
