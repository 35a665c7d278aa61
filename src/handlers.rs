use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Form,
};
use axum_login::AuthSession;
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    app::{AppState, CHANGE_PW_URL},
    auth::Credentials,
    models::{
        Admin, Category, Comment, CommentFilter, Link, NewComment, Post, DEFAULT_CATEGORY_ID,
    },
    utils::{is_valid_email, is_valid_url, page_count, Path},
    Error,
};

fn redirect_with_message(url: &str, message: &str) -> Redirect {
    Redirect::to(format!("{}?message={}", url, message).as_str())
}

#[derive(Deserialize)]
pub struct MessageQuery {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditorPath {
    id: Option<i32>,
}

// ---------------------------------------------------------------------------
// public handlers
// ---------------------------------------------------------------------------

pub async fn handler_home(state: State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    handler_page(state, Path(1)).await
}

pub async fn handler_page(
    State(state): State<Arc<AppState>>,
    Path(page_num): Path<u32>,
) -> Result<Html<String>, StatusCode> {
    // validate `page_num` before querying the database.
    if page_num == 0 {
        return handler_404(State(state)).await;
    }
    let total_post_count = Post::get_total_count(&state.db).await as u32;
    let post_per_page = state.config.post_per_page();
    let max_page = page_count(total_post_count, post_per_page);
    if max_page != 0 && page_num > max_page {
        return handler_404(State(state)).await;
    }
    let posts = Post::get_on_page(&state.db, page_num, post_per_page).await;

    Ok(Html(
        state
            .render_template(
                "home.html",
                context! {
                    posts => posts,
                    page_num => page_num,
                    max_page => max_page,
                },
            )
            .await,
    ))
}

#[derive(Deserialize)]
pub struct PostQuery {
    page: Option<u32>,
    reply: Option<i32>,
    message: Option<String>,
}

pub async fn handler_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<PostQuery>,
    auth_session: AuthSession<AppState>,
) -> Result<Html<String>, StatusCode> {
    let post = match Post::get_by_id(&state.db, id).await {
        Some(post) => post,
        None => return handler_404(State(state)).await,
    };

    let total_comment_count = Comment::get_reviewed_count_by_post(&state.db, id).await as u32;
    let comment_per_page = state.config.comment_per_page();
    let max_comment_page = page_count(total_comment_count, comment_per_page);
    let comment_page = query.page.unwrap_or(1).clamp(1, max_comment_page.max(1));
    let comments =
        Comment::get_reviewed_by_post_on_page(&state.db, id, comment_page, comment_per_page).await;
    // the comment the visitor is replying to, if any. A reply always stays on
    // the post it answers.
    let reply_to = match query.reply {
        Some(reply_id) => Comment::get_by_id(&state.db, reply_id)
            .await
            .filter(|comment| comment.post_id == id),
        None => None,
    };

    Ok(Html(
        state
            .render_template(
                "post.html",
                context! {
                    post => post,
                    comments => comments,
                    total_comment_count => total_comment_count,
                    comment_page => comment_page,
                    max_comment_page => max_comment_page,
                    reply_to => reply_to,
                    logged_in => auth_session.user.is_some(),
                    message => query.message,
                },
            )
            .await,
    ))
}

pub async fn handler_category(
    state: State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Html<String>, StatusCode> {
    handler_category_page(state, Path((id, 1))).await
}

pub async fn handler_category_page(
    State(state): State<Arc<AppState>>,
    Path((id, page_num)): Path<(i32, u32)>,
) -> Result<Html<String>, StatusCode> {
    let category = match Category::get_by_id(&state.db, id).await {
        Some(category) => category,
        None => return handler_404(State(state)).await,
    };
    if page_num == 0 {
        return handler_404(State(state)).await;
    }
    let total_post_count = Post::get_count_by_category(&state.db, id).await as u32;
    let post_per_page = state.config.post_per_page();
    let max_page = page_count(total_post_count, post_per_page);
    if max_page != 0 && page_num > max_page {
        return handler_404(State(state)).await;
    }
    let posts = Post::get_by_category_on_page(&state.db, id, page_num, post_per_page).await;

    Ok(Html(
        state
            .render_template(
                "category.html",
                context! {
                    category => category,
                    posts => posts,
                    page_num => page_num,
                    max_page => max_page,
                },
            )
            .await,
    ))
}

pub async fn handler_about(state: State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    Ok(Html(state.render_template("about.html", context! {}).await))
}

pub async fn handler_404(state: State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    Ok(Html(
        state
            .render_template(
                "error.html",
                context! {
                    title => "404",
                    message => "Oops, it seems like you've stumbled upon a URL that doesn't exist...",
                },
            )
            .await,
    ))
}

pub async fn handler_ping() -> impl IntoResponse {
    "pong"
}

// ---------------------------------------------------------------------------
// comment submission
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CommentForm {
    pub author: String,
    pub email: String,
    pub site: Option<String>,
    pub body: String,
    pub replied_id: Option<i32>,
}

impl CommentForm {
    // the site field is optional, an empty input counts as absent.
    fn normalized_site(&self) -> Option<String> {
        self.site
            .as_deref()
            .map(str::trim)
            .filter(|site| !site.is_empty())
            .map(str::to_string)
    }
}

fn validate_comment_form(form: &CommentForm) -> Result<(), &'static str> {
    let author = form.author.trim();
    if author.is_empty() || author.chars().count() > 30 {
        return Err("Please fill in a name up to 30 characters.");
    }
    if !is_valid_email(form.email.trim()) {
        return Err("Please fill in a valid email address.");
    }
    if let Some(site) = form.normalized_site() {
        if !is_valid_url(&site) {
            return Err("Please fill in a valid site URL or leave it empty.");
        }
    }
    if form.body.trim().is_empty() {
        return Err("Please fill in the comment body.");
    }
    Ok(())
}

// the identity an admin comment is published under, taken from the profile
// and the config instead of the form.
struct AdminIdentity {
    name: String,
    email: String,
    site: String,
}

// An admin comment goes out right away with the profile identity, a visitor
// comment is held back until it is reviewed. Both reject an empty body.
fn build_new_comment(
    form: &CommentForm,
    admin: Option<AdminIdentity>,
    post_id: i32,
) -> Result<NewComment, &'static str> {
    match admin {
        Some(identity) => {
            if form.body.trim().is_empty() {
                return Err("Please fill in the comment body.");
            }
            Ok(NewComment {
                author: identity.name,
                email: identity.email,
                site: Some(identity.site),
                body: form.body.trim().to_string(),
                from_admin: true,
                reviewed: true,
                replied_id: form.replied_id,
                post_id,
            })
        }
        None => {
            validate_comment_form(form)?;
            Ok(NewComment {
                author: form.author.trim().to_string(),
                email: form.email.trim().to_string(),
                site: form.normalized_site(),
                body: form.body.trim().to_string(),
                from_admin: false,
                reviewed: false,
                replied_id: form.replied_id,
                post_id,
            })
        }
    }
}

pub async fn handler_new_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    auth_session: AuthSession<AppState>,
    Form(comment_form): Form<CommentForm>,
) -> impl IntoResponse {
    let post = match Post::get_by_id(&state.db, id).await {
        Some(post) => post,
        None => return handler_404(State(state)).await.into_response(),
    };
    let post_url = format!("/post/{}", id);
    if !post.can_comment {
        return redirect_with_message(&post_url, "Comment is disabled.").into_response();
    }
    // the reply target has to exist and belong to the same post.
    let replied = match comment_form.replied_id {
        Some(replied_id) => {
            match Comment::get_by_id(&state.db, replied_id)
                .await
                .filter(|comment| comment.post_id == id)
            {
                Some(comment) => Some(comment),
                None => {
                    return redirect_with_message(
                        &post_url,
                        "The comment you are replying to no longer exists.",
                    )
                    .into_response()
                }
            }
        }
        None => None,
    };

    let admin_identity = auth_session.user.clone().map(|admin| AdminIdentity {
        name: admin.name,
        email: state
            .config
            .mail()
            .map(|mail| mail.owner().to_string())
            .unwrap_or_default(),
        site: state.config.blog_url(),
    });
    let new_comment = match build_new_comment(&comment_form, admin_identity, id) {
        Ok(new_comment) => new_comment,
        Err(message) => return redirect_with_message(&post_url, message).into_response(),
    };

    if let Err(err) = Comment::insert(&state.db, &new_comment).await {
        error!("failed inserting comment: {:?}", err);
        return redirect_with_message(&post_url, "Something went wrong, please try again.")
            .into_response();
    }

    // notification emails are fire-and-forget, the author never waits on them.
    if let Some(mailer) = &state.mailer {
        if !new_comment.from_admin {
            mailer.send_new_comment_email(post.id, &post.title);
        }
        if let Some(replied) = &replied {
            if !replied.from_admin {
                mailer.send_new_reply_email(&replied.email, post.id, &post.title);
            }
        }
    }

    let message = if new_comment.from_admin {
        "Comment published."
    } else {
        "Thanks, your comment will be published after reviewed."
    };
    Redirect::to(format!("{}?message={}#comments", post_url, message).as_str()).into_response()
}

pub async fn handler_reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let comment = match Comment::get_by_id(&state.db, id).await {
        Some(comment) => comment,
        None => return handler_404(State(state)).await.into_response(),
    };
    let post = match Post::get_by_id(&state.db, comment.post_id).await {
        Some(post) => post,
        None => return handler_404(State(state)).await.into_response(),
    };
    if !post.can_comment {
        return redirect_with_message(&format!("/post/{}", post.id), "Comment is disabled.")
            .into_response();
    }
    Redirect::to(format!("/post/{}?reply={}#comment-form", post.id, comment.id).as_str())
        .into_response()
}

// ---------------------------------------------------------------------------
// auth handlers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
    message: Option<String>,
}

pub async fn handler_login_get(
    state: State<Arc<AppState>>,
    auth_session: AuthSession<AppState>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    // an already-authenticated admin has no business on the login page.
    if auth_session.user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(
        state
            .render_template(
                "login.html",
                context! {next => query.next, message => query.message},
            )
            .await,
    )
    .into_response()
}

pub async fn handler_login_post(
    mut auth_session: AuthSession<AppState>,
    form_result: Result<Form<Credentials>, axum::extract::rejection::FormRejection>,
) -> impl IntoResponse {
    let mut login_url = "/auth/login".to_string();
    // ensure the credentials are valid otherwise redirect to the login page.
    let credentials = match form_result {
        Ok(Form(credentials)) => credentials,
        Err(_) => return Redirect::to(&login_url).into_response(),
    };
    // authenticate the user.
    let admin = match auth_session.authenticate(credentials.clone()).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            login_url = format!("{}?message={}", login_url, "Invalid username or password.");
            if let Some(next) = credentials.next {
                login_url = format!("{}&next={}", login_url, next);
            };

            return Redirect::to(&login_url).into_response();
        }
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    // login the user into the session.
    if auth_session.login(&admin).await.is_err() {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    // redirect to the next page if it exists.
    if let Some(ref next) = credentials.next {
        Redirect::to(next)
    } else {
        Redirect::to("/admin")
    }
    .into_response()
}

pub async fn handler_logout(mut auth_session: AuthSession<AppState>) -> impl IntoResponse {
    match auth_session.logout().await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ---------------------------------------------------------------------------
// admin: dashboard and posts
// ---------------------------------------------------------------------------

pub async fn handler_admin(state: State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    Ok(Html(
        state
            .render_template(
                "admin/dashboard.html",
                context! {
                    post_count => Post::get_total_count(&state.db).await,
                    comment_count => Comment::get_total_count(&state.db).await,
                    category_count => Category::get_total_count(&state.db).await,
                    link_count => Link::get_total_count(&state.db).await,
                },
            )
            .await,
    ))
}

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

pub async fn handler_manage_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, StatusCode> {
    let total_post_count = Post::get_total_count(&state.db).await as u32;
    let post_per_page = state.config.manage_post_per_page();
    let max_page = page_count(total_post_count, post_per_page);
    let page_num = query.page.unwrap_or(1).clamp(1, max_page.max(1));
    let posts = Post::get_on_page(&state.db, page_num, post_per_page).await;

    Ok(Html(
        state
            .render_template(
                "admin/manage_posts.html",
                context! {
                    posts => posts,
                    page_num => page_num,
                    max_page => max_page,
                },
            )
            .await,
    ))
}

pub async fn handler_edit_post_get(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
) -> Result<Html<String>, StatusCode> {
    let post = match editor_path.id {
        Some(id) => Post::get_by_id(&state.db, id).await,
        None => None,
    };

    Ok(Html(
        state
            .render_template("admin/edit_post.html", context! {post => post})
            .await,
    ))
}

#[derive(Deserialize)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub category_id: Option<i32>,
}

fn validate_post_form(form: &PostForm) -> Result<(), &'static str> {
    let title = form.title.trim();
    if title.is_empty() || title.chars().count() > 60 {
        return Err("Please fill in a title up to 60 characters.");
    }
    let subtitle = form.subtitle.trim();
    if subtitle.is_empty() || subtitle.chars().count() > 255 {
        return Err("Please fill in a subtitle up to 255 characters.");
    }
    if form.body.trim().is_empty() {
        return Err("Please fill in the post body.");
    }
    Ok(())
}

pub async fn handler_edit_post_post(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
    Form(post_form): Form<PostForm>,
) -> impl IntoResponse {
    let form_url = match editor_path.id {
        Some(id) => format!("/admin/post/edit/{}", id),
        None => "/admin/post/new".to_string(),
    };
    if let Err(message) = validate_post_form(&post_form) {
        return redirect_with_message(&form_url, message).into_response();
    }

    let title = post_form.title.trim();
    let subtitle = post_form.subtitle.trim();
    let category_id = post_form.category_id.unwrap_or(DEFAULT_CATEGORY_ID);
    let result = match editor_path.id {
        Some(id) => {
            Post::update(&state.db, id, title, subtitle, &post_form.body, category_id).await
        }
        None => Post::insert(&state.db, title, subtitle, &post_form.body, category_id).await,
    };

    match result {
        Ok(post) => Redirect::to(format!("/post/{}", post.id).as_str()).into_response(),
        Err(err) => {
            error!("failed saving post: {:?}", err);
            redirect_with_message(&form_url, "Something went wrong, please try again.")
                .into_response()
        }
    }
}

pub async fn handler_delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(err) = Post::delete(&state.db, id).await {
        error!("failed deleting post: {:?}", err);
    }
    Redirect::to("/admin/post/manage")
}

pub async fn handler_toggle_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(err) = Post::toggle_comment(&state.db, id).await {
        error!("failed toggling the comment switch: {:?}", err);
    }
    Redirect::to("/admin/post/manage")
}

// ---------------------------------------------------------------------------
// admin: comments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ManageCommentsQuery {
    filter: Option<String>,
    page: Option<u32>,
}

pub async fn handler_manage_comments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ManageCommentsQuery>,
) -> Result<Html<String>, StatusCode> {
    let filter = CommentFilter::parse(query.filter.as_deref());
    let total_comment_count = Comment::get_filtered_count(&state.db, filter).await as u32;
    let comment_per_page = state.config.comment_per_page();
    let max_page = page_count(total_comment_count, comment_per_page);
    let page_num = query.page.unwrap_or(1).clamp(1, max_page.max(1));
    let comments =
        Comment::get_filtered_on_page(&state.db, filter, page_num, comment_per_page).await;

    Ok(Html(
        state
            .render_template(
                "admin/manage_comments.html",
                context! {
                    comments => comments,
                    filter => filter,
                    page_num => page_num,
                    max_page => max_page,
                },
            )
            .await,
    ))
}

pub async fn handler_approve_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(err) = Comment::approve(&state.db, id).await {
        error!("failed approving comment: {:?}", err);
    }
    Redirect::to("/admin/comment/manage")
}

pub async fn handler_delete_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(err) = Comment::delete(&state.db, id).await {
        error!("failed deleting comment: {:?}", err);
    }
    Redirect::to("/admin/comment/manage")
}

// ---------------------------------------------------------------------------
// admin: categories
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CategoryRow {
    id: i32,
    name: String,
    post_count: i32,
}

pub async fn handler_manage_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, StatusCode> {
    let mut rows = Vec::new();
    for category in Category::get_all(&state.db).await {
        let post_count = Post::get_count_by_category(&state.db, category.id).await;
        rows.push(CategoryRow {
            id: category.id,
            name: category.name,
            post_count,
        });
    }

    Ok(Html(
        state
            .render_template(
                "admin/manage_categories.html",
                context! {category_rows => rows, message => query.message},
            )
            .await,
    ))
}

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

fn validate_category_form(form: &CategoryForm) -> Result<(), &'static str> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > 30 {
        return Err("Please fill in a name up to 30 characters.");
    }
    Ok(())
}

pub async fn handler_edit_category_get(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, StatusCode> {
    let category = match editor_path.id {
        Some(id) => Category::get_by_id(&state.db, id).await,
        None => None,
    };

    Ok(Html(
        state
            .render_template(
                "admin/edit_category.html",
                context! {category => category, message => query.message},
            )
            .await,
    ))
}

pub async fn handler_edit_category_post(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
    Form(category_form): Form<CategoryForm>,
) -> impl IntoResponse {
    let form_url = match editor_path.id {
        Some(id) => format!("/admin/category/edit/{}", id),
        None => "/admin/category/new".to_string(),
    };
    if let Err(message) = validate_category_form(&category_form) {
        return redirect_with_message(&form_url, message).into_response();
    }

    let name = category_form.name.trim();
    let result = match editor_path.id {
        Some(id) => Category::update(&state.db, id, name).await,
        None => Category::insert(&state.db, name).await.map(|_| ()),
    };

    match result {
        Ok(_) => Redirect::to("/admin/category/manage").into_response(),
        Err(err @ (Error::CategoryNameExists(_) | Error::DefaultCategoryProtected)) => {
            redirect_with_message(&form_url, &err.to_string()).into_response()
        }
        Err(err) => {
            error!("failed saving category: {:?}", err);
            redirect_with_message(&form_url, "Something went wrong, please try again.")
                .into_response()
        }
    }
}

pub async fn handler_delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    match Category::delete(&state.db, id).await {
        Ok(_) => Redirect::to("/admin/category/manage").into_response(),
        Err(err @ Error::DefaultCategoryProtected) => {
            redirect_with_message("/admin/category/manage", &err.to_string()).into_response()
        }
        Err(err) => {
            error!("failed deleting category: {:?}", err);
            Redirect::to("/admin/category/manage").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// admin: links
// ---------------------------------------------------------------------------

pub async fn handler_manage_links(state: State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    Ok(Html(
        state
            .render_template("admin/manage_links.html", context! {})
            .await,
    ))
}

#[derive(Deserialize)]
pub struct LinkForm {
    pub name: String,
    pub url: String,
}

fn validate_link_form(form: &LinkForm) -> Result<(), &'static str> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > 30 {
        return Err("Please fill in a name up to 30 characters.");
    }
    if !is_valid_url(form.url.trim()) {
        return Err("Please fill in a valid URL.");
    }
    Ok(())
}

pub async fn handler_edit_link_get(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, StatusCode> {
    let link = match editor_path.id {
        Some(id) => Link::get_by_id(&state.db, id).await,
        None => None,
    };

    Ok(Html(
        state
            .render_template(
                "admin/edit_link.html",
                context! {link => link, message => query.message},
            )
            .await,
    ))
}

pub async fn handler_edit_link_post(
    State(state): State<Arc<AppState>>,
    Path(editor_path): Path<EditorPath>,
    Form(link_form): Form<LinkForm>,
) -> impl IntoResponse {
    let form_url = match editor_path.id {
        Some(id) => format!("/admin/link/edit/{}", id),
        None => "/admin/link/new".to_string(),
    };
    if let Err(message) = validate_link_form(&link_form) {
        return redirect_with_message(&form_url, message).into_response();
    }

    let name = link_form.name.trim();
    let url = link_form.url.trim();
    let result = match editor_path.id {
        Some(id) => Link::update(&state.db, id, name, url).await,
        None => Link::insert(&state.db, name, url).await,
    };

    match result {
        Ok(_) => Redirect::to("/admin/link/manage").into_response(),
        Err(err) => {
            error!("failed saving link: {:?}", err);
            redirect_with_message(&form_url, "Something went wrong, please try again.")
                .into_response()
        }
    }
}

pub async fn handler_delete_link(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    if let Err(err) = Link::delete(&state.db, id).await {
        error!("failed deleting link: {:?}", err);
    }
    Redirect::to("/admin/link/manage")
}

// ---------------------------------------------------------------------------
// admin: settings and password
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SettingsForm {
    pub name: String,
    pub blog_title: String,
    pub blog_sub_title: String,
    pub about: String,
}

fn validate_settings_form(form: &SettingsForm) -> Result<(), &'static str> {
    let name = form.name.trim();
    if name.is_empty() || name.chars().count() > 30 {
        return Err("Please fill in a name up to 30 characters.");
    }
    let blog_title = form.blog_title.trim();
    if blog_title.is_empty() || blog_title.chars().count() > 60 {
        return Err("Please fill in a blog title up to 60 characters.");
    }
    let blog_sub_title = form.blog_sub_title.trim();
    if blog_sub_title.is_empty() || blog_sub_title.chars().count() > 100 {
        return Err("Please fill in a blog subtitle up to 100 characters.");
    }
    if form.about.trim().is_empty() {
        return Err("Please fill in the about page.");
    }
    Ok(())
}

pub async fn handler_settings_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, StatusCode> {
    Ok(Html(
        state
            .render_template("admin/settings.html", context! {message => query.message})
            .await,
    ))
}

pub async fn handler_settings_post(
    State(state): State<Arc<AppState>>,
    Form(settings_form): Form<SettingsForm>,
) -> impl IntoResponse {
    if let Err(message) = validate_settings_form(&settings_form) {
        return redirect_with_message("/admin/settings", message).into_response();
    }
    match Admin::update_profile(
        &state.db,
        settings_form.name.trim(),
        settings_form.blog_title.trim(),
        settings_form.blog_sub_title.trim(),
        &settings_form.about,
    )
    .await
    {
        Ok(_) => redirect_with_message("/admin/settings", "Settings updated.").into_response(),
        Err(err) => {
            error!("failed updating settings: {:?}", err);
            redirect_with_message("/admin/settings", "Something went wrong, please try again.")
                .into_response()
        }
    }
}

pub async fn handler_change_pw_get(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
) -> Result<Html<String>, StatusCode> {
    Ok(Html(
        state
            .render_template("admin/change_pw.html", context! {message => query.message})
            .await,
    ))
}

#[derive(Deserialize)]
pub struct ChangePasswordForm {
    old_password: String,
    new_password: String,
}

pub async fn handler_change_pw_post(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession<AppState>,
    Form(change_pw_form): Form<ChangePasswordForm>,
) -> impl IntoResponse {
    // get the current user.
    let admin = match auth_session.user.clone() {
        Some(admin) => admin,
        // redirect to the login page if the user is not logged in.
        None => return Redirect::to("/auth/login").into_response(),
    };
    // authenticate to check if the username and password are correct.
    let admin = match auth_session
        .authenticate(Credentials {
            username: admin.username,
            password: change_pw_form.old_password,
            next: None,
        })
        .await
    {
        Ok(Some(admin)) => admin,
        _ => {
            return redirect_with_message(
                CHANGE_PW_URL,
                "Failed to validate the old password, please try again.",
            )
            .into_response()
        }
    };
    // update the password hash in the database.
    match Admin::modify_password(
        &state.db,
        &admin.username,
        &admin.password,
        &password_auth::generate_hash(&change_pw_form.new_password),
    )
    .await
    {
        Ok(_) => Redirect::to("/admin").into_response(),
        Err(_) => redirect_with_message(
            CHANGE_PW_URL,
            "Failed to update the password, please try again.",
        )
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_new_comment, validate_category_form, validate_comment_form, validate_link_form,
        validate_post_form, validate_settings_form, AdminIdentity, CategoryForm, CommentForm,
        LinkForm, PostForm, SettingsForm,
    };

    fn comment_form(author: &str, email: &str, site: Option<&str>, body: &str) -> CommentForm {
        CommentForm {
            author: author.to_string(),
            email: email.to_string(),
            site: site.map(str::to_string),
            body: body.to_string(),
            replied_id: None,
        }
    }

    #[test]
    fn test_validate_comment_form() {
        assert!(validate_comment_form(&comment_form(
            "Alice",
            "alice@example.com",
            Some("https://alice.example.com"),
            "Nice post!"
        ))
        .is_ok());
        // the site is optional, both missing and empty are fine.
        assert!(
            validate_comment_form(&comment_form("Alice", "alice@example.com", None, "Hi")).is_ok()
        );
        assert!(
            validate_comment_form(&comment_form("Alice", "alice@example.com", Some(""), "Hi"))
                .is_ok()
        );
        assert!(
            validate_comment_form(&comment_form("", "alice@example.com", None, "Hi")).is_err()
        );
        assert!(validate_comment_form(&comment_form(
            &"a".repeat(31),
            "alice@example.com",
            None,
            "Hi"
        ))
        .is_err());
        assert!(validate_comment_form(&comment_form("Alice", "not-an-email", None, "Hi")).is_err());
        assert!(validate_comment_form(&comment_form(
            "Alice",
            "alice@example.com",
            Some("not a url"),
            "Hi"
        ))
        .is_err());
        assert!(
            validate_comment_form(&comment_form("Alice", "alice@example.com", None, "  ")).is_err()
        );
    }

    fn admin_identity() -> AdminIdentity {
        AdminIdentity {
            name: "Owner".to_string(),
            email: "owner@breakblog.me".to_string(),
            site: "https://breakblog.me".to_string(),
        }
    }

    #[test]
    fn test_build_new_comment_as_admin() {
        // the form identity fields are ignored, the profile one wins, and the
        // comment is published right away.
        let form = comment_form("ignored", "ignored", None, "  Welcome!  ");
        let comment = build_new_comment(&form, Some(admin_identity()), 7).unwrap();
        assert_eq!(comment.author, "Owner");
        assert_eq!(comment.email, "owner@breakblog.me");
        assert_eq!(comment.site.as_deref(), Some("https://breakblog.me"));
        assert_eq!(comment.body, "Welcome!");
        assert!(comment.from_admin);
        assert!(comment.reviewed);
        assert_eq!(comment.post_id, 7);
    }

    #[test]
    fn test_build_new_comment_as_admin_rejects_empty_body() {
        let form = comment_form("", "", None, "   ");
        assert!(build_new_comment(&form, Some(admin_identity()), 7).is_err());
    }

    #[test]
    fn test_build_new_comment_as_visitor() {
        let mut form = comment_form("Alice", "alice@example.com", Some(""), "Nice post!");
        form.replied_id = Some(3);
        let comment = build_new_comment(&form, None, 7).unwrap();
        assert_eq!(comment.author, "Alice");
        assert_eq!(comment.site, None);
        assert!(!comment.from_admin);
        assert!(!comment.reviewed);
        assert_eq!(comment.replied_id, Some(3));

        // visitors go through the full form validation.
        let form = comment_form("Alice", "not-an-email", None, "Nice post!");
        assert!(build_new_comment(&form, None, 7).is_err());
    }

    #[test]
    fn test_validate_post_form() {
        let form = PostForm {
            title: "Hello".to_string(),
            subtitle: "A greeting".to_string(),
            body: "World".to_string(),
            category_id: Some(1),
        };
        assert!(validate_post_form(&form).is_ok());
        assert!(validate_post_form(&PostForm {
            title: " ".to_string(),
            ..comment_free_post_form()
        })
        .is_err());
        assert!(validate_post_form(&PostForm {
            title: "t".repeat(61),
            ..comment_free_post_form()
        })
        .is_err());
        assert!(validate_post_form(&PostForm {
            body: "".to_string(),
            ..comment_free_post_form()
        })
        .is_err());
    }

    fn comment_free_post_form() -> PostForm {
        PostForm {
            title: "Hello".to_string(),
            subtitle: "A greeting".to_string(),
            body: "World".to_string(),
            category_id: None,
        }
    }

    #[test]
    fn test_validate_category_form() {
        assert!(validate_category_form(&CategoryForm {
            name: "Rust".to_string()
        })
        .is_ok());
        assert!(validate_category_form(&CategoryForm {
            name: "  ".to_string()
        })
        .is_err());
        assert!(validate_category_form(&CategoryForm {
            name: "c".repeat(31)
        })
        .is_err());
    }

    #[test]
    fn test_validate_link_form() {
        assert!(validate_link_form(&LinkForm {
            name: "GitHub".to_string(),
            url: "https://github.com".to_string()
        })
        .is_ok());
        assert!(validate_link_form(&LinkForm {
            name: "GitHub".to_string(),
            url: "github.com".to_string()
        })
        .is_err());
        assert!(validate_link_form(&LinkForm {
            name: "".to_string(),
            url: "https://github.com".to_string()
        })
        .is_err());
    }

    #[test]
    fn test_validate_settings_form() {
        let form = SettingsForm {
            name: "tw".to_string(),
            blog_title: "BreakBlog".to_string(),
            blog_sub_title: "Still more to work on".to_string(),
            about: "Hello World!".to_string(),
        };
        assert!(validate_settings_form(&form).is_ok());
        assert!(validate_settings_form(&SettingsForm {
            blog_sub_title: "s".repeat(101),
            ..form_clone(&form)
        })
        .is_err());
        assert!(validate_settings_form(&SettingsForm {
            about: " ".to_string(),
            ..form_clone(&form)
        })
        .is_err());
    }

    fn form_clone(form: &SettingsForm) -> SettingsForm {
        SettingsForm {
            name: form.name.clone(),
            blog_title: form.blog_title.clone(),
            blog_sub_title: form.blog_sub_title.clone(),
            about: form.about.clone(),
        }
    }
}
