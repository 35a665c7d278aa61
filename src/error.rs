use tokio::task;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    MiniJinja(#[from] minijinja::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),

    #[error(transparent)]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error(transparent)]
    MailAddress(#[from] lettre::address::AddressError),

    #[error("config validation failed: {0}")]
    ConfigValidation(String),

    #[error("category <{0}> already exists")]
    CategoryNameExists(String),

    #[error("the default category is protected and cannot be edited or deleted")]
    DefaultCategoryProtected,
}
