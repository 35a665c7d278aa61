use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;
use tracing::info;

use crate::Error;

// `replied_author` is joined in so a reply can show who it answers.
const COMMENT_COLUMNS: &str = "c.id, c.author, c.email, c.site, c.body, c.from_admin, \
                               c.reviewed, c.replied_id, c.post_id, \
                               r.author AS replied_author, c.created_at";

#[derive(Debug, FromRow, Serialize)]
pub struct Comment {
    pub id: i32,
    pub author: String,
    pub email: String,
    pub site: Option<String>,
    pub body: String,
    pub from_admin: bool,
    pub reviewed: bool,
    pub replied_id: Option<i32>,
    pub post_id: i32,
    pub replied_author: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct NewComment {
    pub author: String,
    pub email: String,
    pub site: Option<String>,
    pub body: String,
    pub from_admin: bool,
    pub reviewed: bool,
    pub replied_id: Option<i32>,
    pub post_id: i32,
}

// Which slice of the comments the admin management page shows.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentFilter {
    All,
    Unread,
    Admin,
}

impl CommentFilter {
    pub fn parse(filter: Option<&str>) -> Self {
        match filter {
            Some("unread") => Self::Unread,
            Some("admin") => Self::Admin,
            _ => Self::All,
        }
    }

    fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "TRUE",
            Self::Unread => "c.reviewed = FALSE",
            Self::Admin => "c.from_admin = TRUE",
        }
    }
}

impl Comment {
    pub async fn get_reviewed_by_post_on_page(
        db: &sqlx::MySqlPool,
        post_id: i32,
        page: u32,
        comment_per_page: u32,
    ) -> Vec<Self> {
        sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments AS c
             LEFT JOIN comments AS r ON c.replied_id = r.id
             WHERE c.post_id = ? AND c.reviewed = TRUE
             ORDER BY c.created_at ASC, c.id ASC LIMIT ? OFFSET ?"
        ))
        .bind(post_id)
        .bind(comment_per_page)
        .bind((page - 1) * comment_per_page)
        .fetch_all(db)
        .await
        .unwrap_or_default()
    }

    pub async fn get_reviewed_count_by_post(db: &sqlx::MySqlPool, post_id: i32) -> i32 {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ? AND reviewed = TRUE")
            .bind(post_id)
            .fetch_one(db)
            .await
            .unwrap_or_default()
    }

    pub async fn get_filtered_on_page(
        db: &sqlx::MySqlPool,
        filter: CommentFilter,
        page: u32,
        comment_per_page: u32,
    ) -> Vec<Self> {
        sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments AS c
             LEFT JOIN comments AS r ON c.replied_id = r.id
             WHERE {}
             ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?",
            filter.where_clause()
        ))
        .bind(comment_per_page)
        .bind((page - 1) * comment_per_page)
        .fetch_all(db)
        .await
        .unwrap_or_default()
    }

    pub async fn get_filtered_count(db: &sqlx::MySqlPool, filter: CommentFilter) -> i32 {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM comments AS c WHERE {}",
            filter.where_clause()
        ))
        .fetch_one(db)
        .await
        .unwrap_or_default()
    }

    pub async fn get_total_count(db: &sqlx::MySqlPool) -> i32 {
        Self::get_filtered_count(db, CommentFilter::All).await
    }

    pub async fn get_unread_count(db: &sqlx::MySqlPool) -> i32 {
        Self::get_filtered_count(db, CommentFilter::Unread).await
    }

    pub async fn get_by_id(db: &sqlx::MySqlPool, id: i32) -> Option<Self> {
        sqlx::query_as(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments AS c
             LEFT JOIN comments AS r ON c.replied_id = r.id
             WHERE c.id = ?"
        ))
        .bind(id)
        .fetch_one(db)
        .await
        .ok()
    }

    pub async fn insert(db: &sqlx::MySqlPool, comment: &NewComment) -> Result<i32, Error> {
        let mut tx = db.begin().await?;

        sqlx::query(
            "INSERT INTO comments (author, email, site, body, from_admin, reviewed, replied_id, post_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NOW())",
        )
        .bind(&comment.author)
        .bind(&comment.email)
        .bind(&comment.site)
        .bind(&comment.body)
        .bind(comment.from_admin)
        .bind(comment.reviewed)
        .bind(comment.replied_id)
        .bind(comment.post_id)
        .execute(&mut *tx)
        .await?;
        let id = sqlx::query_scalar::<_, u64>("SELECT LAST_INSERT_ID()")
            .fetch_one(&mut *tx)
            .await? as i32;

        tx.commit().await?;
        info!("inserted comment {} on post {}", id, comment.post_id);

        Ok(id)
    }

    pub async fn approve(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE comments SET reviewed = TRUE WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        info!("approved comment {}", id);
        Ok(())
    }

    // Comments form an adjacency list via `replied_id`, so deleting one has to
    // walk the reply tree and take every descendant with it.
    pub async fn delete(db: &sqlx::MySqlPool, id: i32) -> Result<(), Error> {
        let mut tx = db.begin().await?;

        let mut pending = vec![id];
        let mut doomed = Vec::new();
        while let Some(comment_id) = pending.pop() {
            let replies: Vec<i32> =
                sqlx::query_scalar("SELECT id FROM comments WHERE replied_id = ?")
                    .bind(comment_id)
                    .fetch_all(&mut *tx)
                    .await?;
            pending.extend(replies);
            doomed.push(comment_id);
        }
        for comment_id in &doomed {
            sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("deleted comment {} and {} replies", id, doomed.len() - 1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CommentFilter;

    #[test]
    fn test_parse_comment_filter() {
        assert_eq!(CommentFilter::parse(None), CommentFilter::All);
        assert_eq!(CommentFilter::parse(Some("all")), CommentFilter::All);
        assert_eq!(CommentFilter::parse(Some("unread")), CommentFilter::Unread);
        assert_eq!(CommentFilter::parse(Some("admin")), CommentFilter::Admin);
        // unknown filters fall back to showing everything.
        assert_eq!(CommentFilter::parse(Some("bogus")), CommentFilter::All);
    }
}
