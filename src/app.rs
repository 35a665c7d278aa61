use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use axum_login::{
    login_required,
    tower_sessions::{cookie::time::Duration, Expiry, MemoryStore, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use comrak::{markdown_to_html_with_plugins, plugins::syntect, Options, Plugins};
use minijinja::{context, path_loader, Environment, Value};
use tower_http::{
    services::ServeDir,
    trace::{self, TraceLayer},
};
use tower_sessions::cookie::Key;
use tracing::{info, Level};

use crate::{
    config::Config,
    error::Error,
    fakes,
    handlers::{
        handler_404, handler_about, handler_admin, handler_approve_comment, handler_category,
        handler_category_page, handler_change_pw_get, handler_change_pw_post,
        handler_delete_category, handler_delete_comment, handler_delete_link, handler_delete_post,
        handler_edit_category_get, handler_edit_category_post, handler_edit_link_get,
        handler_edit_link_post, handler_edit_post_get, handler_edit_post_post, handler_home,
        handler_login_get, handler_login_post, handler_logout, handler_manage_categories,
        handler_manage_comments, handler_manage_links, handler_manage_posts, handler_new_comment,
        handler_page, handler_ping, handler_post, handler_reply, handler_settings_get,
        handler_settings_post, handler_toggle_comment,
    },
    mail::Mailer,
    models::{create_tables, drop_tables, ensure_default_category, Admin, Category, Comment, Link},
};

const TEMPLATES_DIR: &str = "templates";
const STATIC_DIR: &str = "static";

// AppState is used to pass the global states to the handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub env: Environment<'static>,
    pub db: sqlx::MySqlPool,
    pub mailer: Option<Mailer>,
}

impl AppState {
    pub async fn new(config_path: &str) -> Result<Self, Error> {
        info!("parsing config file");
        let config = Config::new(config_path)?;

        info!("connecting to the database");
        // connect to the database.
        let db = match sqlx::MySqlPool::connect(&config.mysql_connection_url()).await {
            Ok(db) => db,
            Err(e) => return Err(Error::Sqlx(e)),
        };
        info!("initializing the database");
        // create the tables if they don't exist and make sure the default
        // category is in place.
        create_tables(&db).await?;
        ensure_default_category(&db).await?;

        info!("initializing the mailer");
        let mailer = Mailer::from_config(&config)?;

        info!("initializing the environment");
        let mut env = Environment::new();
        env.set_loader(path_loader(TEMPLATES_DIR));
        // load the global variables into the environment.
        env.add_global("config", Value::from_object(config.clone()));
        // load the embedded functions into the environment.
        let config_clone = config.clone();
        env.add_filter("md_to_html", move |md_content: &str| {
            Self::md_to_html(&config_clone, md_content)
        });
        env.add_filter("truncate_str", |value: &str, max_length: usize| {
            if value.chars().count() > max_length {
                value.chars().take(max_length).collect()
            } else {
                value.to_string()
            }
        });
        env.add_filter("to_lowercase", |value: &str| value.to_lowercase());

        Ok(Self {
            config,
            env,
            db,
            mailer,
        })
    }

    fn md_to_html(config: &Config, md_content: &str) -> String {
        // enable some extension options.
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options.render.figure_with_caption = true;
        // enable the syntax highlight adapter.
        let mut plugins = Plugins::default();
        let adapter = syntect::SyntectAdapterBuilder::new()
            .theme(config.code_syntax_highlight_theme().as_str())
            .build();
        plugins.render.codefence_syntax_highlighter = Some(&adapter);

        markdown_to_html_with_plugins(md_content, &options, &plugins)
    }

    pub async fn render_template(&self, template_name: &str, context: Value) -> String {
        let template = self.env.get_template(template_name).unwrap();
        template
            .render(context! {
                admin => Admin::get(&self.db).await,
                categories => Category::get_all(&self.db).await,
                links => Link::get_all(&self.db).await,
                unread_comment_count => Comment::get_unread_count(&self.db).await,
                ..context,
            })
            .unwrap()
    }
}

pub const CHANGE_PW_URL: &str = "/admin/change-password";

pub struct App {
    state: AppState,
}

impl App {
    pub async fn new(config_path: &str) -> Result<Self, Error> {
        Ok(Self {
            state: AppState::new(config_path).await?,
        })
    }

    // create the admin account (or refresh its credentials) and make sure the
    // schema is ready, this is the `init` subcommand.
    pub async fn init_admin(&self, username: &str, password: &str) -> Result<(), Error> {
        Admin::upsert(
            &self.state.db,
            username,
            &password_auth::generate_hash(password),
        )
        .await?;
        info!("the admin account {} is ready", username);
        Ok(())
    }

    // drop everything and refill the database with demo data, this is the
    // `forge` subcommand.
    pub async fn forge(&self, categories: u32, posts: u32, comments: u32) -> Result<(), Error> {
        info!("dropping and recreating the tables");
        drop_tables(&self.state.db).await?;
        create_tables(&self.state.db).await?;
        fakes::forge(&self.state.db, categories, posts, comments).await?;
        Ok(())
    }

    pub async fn serve(&self) -> Result<(), Error> {
        // session layer resident in memory.
        let session_layer = SessionManagerLayer::new(MemoryStore::default())
            .with_secure(false)
            .with_expiry(Expiry::OnInactivity(Duration::days(
                self.state.config.admin_inactive_expiry_days(),
            )))
            .with_signed(Key::generate());
        // authentication layer
        let auth_layer = AuthManagerLayerBuilder::new(self.state.clone(), session_layer).build();

        let admin_router = Router::new()
            .route("/admin", get(handler_admin))
            .route(CHANGE_PW_URL, get(handler_change_pw_get))
            .route(CHANGE_PW_URL, post(handler_change_pw_post))
            .route("/admin/post/manage", get(handler_manage_posts))
            .route("/admin/post/new", get(handler_edit_post_get))
            .route("/admin/post/new", post(handler_edit_post_post))
            .route("/admin/post/edit/:id", get(handler_edit_post_get))
            .route("/admin/post/edit/:id", post(handler_edit_post_post))
            .route("/admin/post/delete/:id", get(handler_delete_post))
            .route("/admin/post/toggle-comment/:id", get(handler_toggle_comment))
            .route("/admin/comment/manage", get(handler_manage_comments))
            .route("/admin/comment/approve/:id", get(handler_approve_comment))
            .route("/admin/comment/delete/:id", get(handler_delete_comment))
            .route("/admin/category/manage", get(handler_manage_categories))
            .route("/admin/category/new", get(handler_edit_category_get))
            .route("/admin/category/new", post(handler_edit_category_post))
            .route("/admin/category/edit/:id", get(handler_edit_category_get))
            .route("/admin/category/edit/:id", post(handler_edit_category_post))
            .route("/admin/category/delete/:id", get(handler_delete_category))
            .route("/admin/link/manage", get(handler_manage_links))
            .route("/admin/link/new", get(handler_edit_link_get))
            .route("/admin/link/new", post(handler_edit_link_post))
            .route("/admin/link/edit/:id", get(handler_edit_link_get))
            .route("/admin/link/edit/:id", post(handler_edit_link_post))
            .route("/admin/link/delete/:id", get(handler_delete_link))
            .route("/admin/settings", get(handler_settings_get))
            .route("/admin/settings", post(handler_settings_post))
            .route("/auth/logout", get(handler_logout))
            .route_layer(login_required!(AppState, login_url = "/auth/login"))
            .route("/auth/login", get(handler_login_get))
            .route("/auth/login", post(handler_login_post));

        let app = Router::new()
            .fallback(handler_404)
            // serve the static files
            .nest_service("/static", ServeDir::new(STATIC_DIR))
            // serve the page handlers
            .route("/", get(handler_home))
            .route("/page/:num", get(handler_page))
            .route("/post/:id", get(handler_post))
            .route("/post/:id/comment", post(handler_new_comment))
            .route("/reply/comment/:id", get(handler_reply))
            .route("/category/:id", get(handler_category))
            .route("/category/:id/:num", get(handler_category_page))
            .route("/about", get(handler_about))
            .route("/ping", get(handler_ping))
            .merge(admin_router)
            .layer(auth_layer)
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
            )
            .with_state(Arc::new(self.state.clone()));

        let listener = tokio::net::TcpListener::bind(self.state.config.server_url()).await?;
        info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
