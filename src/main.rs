use breakblog::App;
use clap::{Parser, Subcommand};
use tracing::error;

#[derive(Parser)]
#[command(name = "breakblog", about = "A single-author blog engine.")]
struct Cli {
    /// Path of the config file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the blog server.
    Serve,
    /// Create the tables and the admin account, or refresh its credentials.
    Init {
        /// The username used to login.
        #[arg(long)]
        username: String,
        /// The password used to login.
        #[arg(long)]
        password: String,
    },
    /// Drop everything and generate fake demo data.
    Forge {
        /// Quantity of categories.
        #[arg(long, default_value_t = 10)]
        categories: u32,
        /// Quantity of posts.
        #[arg(long, default_value_t = 50)]
        posts: u32,
        /// Quantity of comments.
        #[arg(long, default_value_t = 500)]
        comments: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let app = match App::new(&cli.config).await {
        Ok(app) => app,
        Err(e) => {
            error!("failed to create app: {}", e);
            return;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app.serve().await,
        Command::Init { username, password } => app.init_admin(&username, &password).await,
        Command::Forge {
            categories,
            posts,
            comments,
        } => app.forge(categories, posts, comments).await,
    };
    if let Err(e) = result {
        error!("failed to run app: {}", e);
    }
}
