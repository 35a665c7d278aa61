mod admins;
mod categories;
mod comments;
mod links;
mod posts;

pub(crate) use admins::*;
pub(crate) use categories::*;
pub(crate) use comments::*;
pub(crate) use links::*;
pub(crate) use posts::*;

const CREATE_TABLE_ADMINS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS admins (
    id INT AUTO_INCREMENT PRIMARY KEY,
    username VARCHAR(20) NOT NULL,
    password VARCHAR(255) NOT NULL,
    blog_title VARCHAR(60) NOT NULL,
    blog_sub_title VARCHAR(100) NOT NULL,
    name VARCHAR(30) NOT NULL,
    about TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
) CHARSET = utf8mb4;
"#;

const CREATE_TABLE_CATEGORIES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id INT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(30) NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
) CHARSET = utf8mb4;
"#;

const CREATE_TABLE_POSTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id INT AUTO_INCREMENT PRIMARY KEY,
    title VARCHAR(60) NOT NULL,
    subtitle VARCHAR(255) NOT NULL,
    body TEXT NOT NULL,
    can_comment BOOLEAN NOT NULL DEFAULT TRUE,
    category_id INT NOT NULL DEFAULT 1,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    INDEX(category_id),
    INDEX(created_at)
) CHARSET = utf8mb4;
"#;

const CREATE_TABLE_COMMENTS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS comments (
    id INT AUTO_INCREMENT PRIMARY KEY,
    author VARCHAR(30) NOT NULL,
    email VARCHAR(254) NOT NULL,
    site VARCHAR(255),
    body TEXT NOT NULL,
    from_admin BOOLEAN NOT NULL DEFAULT FALSE,
    reviewed BOOLEAN NOT NULL DEFAULT FALSE,
    replied_id INT,
    post_id INT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    INDEX(post_id),
    INDEX(replied_id),
    INDEX(reviewed)
) CHARSET = utf8mb4;
"#;

const CREATE_TABLE_LINKS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS links (
    id INT AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(30) NOT NULL,
    url VARCHAR(255) NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
) CHARSET = utf8mb4;
"#;

// Every post always belongs to a category, this one is the fallback and can
// neither be edited nor deleted.
pub const DEFAULT_CATEGORY_ID: i32 = 1;
pub const DEFAULT_CATEGORY_NAME: &str = "Default";

pub async fn create_tables(db: &sqlx::MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_TABLE_ADMINS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_CATEGORIES_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_POSTS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_COMMENTS_SQL).execute(db).await?;
    sqlx::query(CREATE_TABLE_LINKS_SQL).execute(db).await?;
    Ok(())
}

pub async fn drop_tables(db: &sqlx::MySqlPool) -> Result<(), sqlx::Error> {
    for table in ["comments", "posts", "links", "categories", "admins"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(db)
            .await?;
    }
    Ok(())
}

pub async fn ensure_default_category(db: &sqlx::MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT IGNORE INTO categories (id, name) VALUES (?, ?)")
        .bind(DEFAULT_CATEGORY_ID)
        .bind(DEFAULT_CATEGORY_NAME)
        .execute(db)
        .await?;
    Ok(())
}
