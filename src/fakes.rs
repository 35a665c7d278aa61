use chrono::{DateTime, Duration, Utc};
use fake::faker::chrono::en::DateTimeBetween;
use fake::faker::internet::en::FreeEmail;
use fake::faker::lorem::en::{Paragraphs, Sentence, Word};
use fake::faker::name::en::Name;
use fake::Fake;
use rand::seq::SliceRandom;
use tracing::info;

use crate::{
    models::{ensure_default_category, Category},
    Error,
};

// Demo-data generator behind the `forge` subcommand. The insertion order
// matters: admin, categories, posts, then comments.
pub async fn forge(
    db: &sqlx::MySqlPool,
    category_count: u32,
    post_count: u32,
    comment_count: u32,
) -> Result<(), Error> {
    info!("generating the administrator");
    fake_admin(db).await?;
    info!("generating {} categories", category_count);
    fake_categories(db, category_count).await?;
    info!("generating {} posts", post_count);
    fake_posts(db, post_count).await?;
    info!("generating {} comments", comment_count);
    fake_comments(db, comment_count).await?;
    info!("generating links");
    fake_links(db).await?;
    Ok(())
}

fn timestamp_this_year() -> DateTime<Utc> {
    DateTimeBetween(Utc::now() - Duration::days(365), Utc::now()).fake()
}

async fn fake_admin(db: &sqlx::MySqlPool) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO admins (username, password, blog_title, blog_sub_title, name, about)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind("admin")
    .bind(password_auth::generate_hash("helloworld"))
    .bind("BreakBlog")
    .bind("You still have lots more to work on!")
    .bind(Name().fake::<String>())
    .bind("Hello World!")
    .execute(db)
    .await?;
    Ok(())
}

async fn fake_categories(db: &sqlx::MySqlPool, count: u32) -> Result<(), Error> {
    // the default category comes first, then random ones. Names are unique,
    // so a duplicated random word is simply skipped.
    ensure_default_category(db).await.map_err(Error::Sqlx)?;
    for _ in 1..count {
        match Category::insert(db, &Word().fake::<String>()).await {
            Ok(_) | Err(Error::CategoryNameExists(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn category_ids(db: &sqlx::MySqlPool) -> Result<Vec<i32>, Error> {
    sqlx::query_scalar("SELECT id FROM categories")
        .fetch_all(db)
        .await
        .map_err(|e| e.into())
}

async fn fake_posts(db: &sqlx::MySqlPool, count: u32) -> Result<(), Error> {
    let category_ids = category_ids(db).await?;
    let mut rng = rand::thread_rng();
    for _ in 0..count {
        sqlx::query(
            "INSERT INTO posts (title, subtitle, body, category_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Sentence(3..8).fake::<String>())
        .bind(Sentence(8..16).fake::<String>())
        .bind(Paragraphs(3..8).fake::<Vec<String>>().join("\n\n"))
        .bind(category_ids.choose(&mut rng).copied().unwrap_or(1))
        .bind(timestamp_this_year())
        .bind(timestamp_this_year())
        .execute(db)
        .await?;
    }
    Ok(())
}

async fn insert_fake_comment(
    db: &sqlx::MySqlPool,
    post_id: i32,
    from_admin: bool,
    reviewed: bool,
    replied_id: Option<i32>,
) -> Result<(), Error> {
    let (author, email, site) = if from_admin {
        (
            "admin".to_string(),
            "admin@breakblog.me".to_string(),
            "https://breakblog.me".to_string(),
        )
    } else {
        (
            Name().fake::<String>(),
            FreeEmail().fake::<String>(),
            format!("https://{}.example.com", Word().fake::<String>()),
        )
    };
    sqlx::query(
        "INSERT INTO comments (author, email, site, body, from_admin, reviewed, replied_id, post_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(author)
    .bind(email)
    .bind(site)
    .bind(Sentence(4..12).fake::<String>())
    .bind(from_admin)
    .bind(reviewed)
    .bind(replied_id)
    .bind(post_id)
    .bind(timestamp_this_year())
    .execute(db)
    .await?;
    Ok(())
}

async fn fake_comments(db: &sqlx::MySqlPool, count: u32) -> Result<(), Error> {
    let post_ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM posts")
        .fetch_all(db)
        .await?;
    if post_ids.is_empty() {
        return Ok(());
    }

    let random_post = |rng: &mut rand::rngs::ThreadRng| post_ids.choose(rng).copied().unwrap();

    let mut rng = rand::thread_rng();
    for _ in 0..count {
        let post_id = random_post(&mut rng);
        insert_fake_comment(db, post_id, false, true, None).await?;
    }

    // a 10% salt each of unreviewed and admin-authored comments.
    let salt = count / 10;
    for _ in 0..salt {
        let post_id = random_post(&mut rng);
        insert_fake_comment(db, post_id, false, false, None).await?;
        let post_id = random_post(&mut rng);
        insert_fake_comment(db, post_id, true, true, None).await?;
    }

    // and another 10% of replies, each attached to the post of its target so
    // the thread stays consistent.
    let comment_targets: Vec<(i32, i32)> =
        sqlx::query_as("SELECT id, post_id FROM comments WHERE reviewed = TRUE")
            .fetch_all(db)
            .await?;
    for _ in 0..salt {
        if let Some((replied_id, post_id)) = comment_targets.choose(&mut rng).copied() {
            insert_fake_comment(db, post_id, false, true, Some(replied_id)).await?;
        }
    }
    Ok(())
}

async fn fake_links(db: &sqlx::MySqlPool) -> Result<(), Error> {
    for (name, url) in [
        ("Twitter", "https://twitter.com"),
        ("Facebook", "https://facebook.com"),
        ("LinkedIn", "https://linkedin.com"),
        ("GitHub", "https://github.com"),
    ] {
        sqlx::query("INSERT INTO links (name, url) VALUES (?, ?)")
            .bind(name)
            .bind(url)
            .execute(db)
            .await?;
    }
    Ok(())
}
