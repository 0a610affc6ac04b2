//! HTTP request handlers for the blog application
//!
//! Every handler either renders a page document or redirects. Pages are JSON
//! documents naming the template they stand for, merged with the request
//! context and the page's own data:
//!
//! ```json
//! { "page": "article_list", "user_id": "...", "blog": {...}, "url_logout": "...", "object_list": [] }
//! ```
//!
//! Create flows are shared between the administration routes and the wizard
//! routes; the variants differ only in template name and success redirect.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::{self, AppState};
use crate::error::{AppError, Result};
use crate::model::{Article, ArticleForm, Blog, BlogForm, BlogWithArticles, RequestContext};
use crate::route;
use crate::validation::{self, FormErrors};

#[derive(Serialize)]
struct Page<'a> {
    page: &'static str,
    #[serde(flatten)]
    context: &'a RequestContext,
    #[serde(flatten)]
    data: Value,
}

fn render(page: &'static str, context: &RequestContext, data: Value) -> Response {
    Json(Page {
        page,
        context,
        data,
    })
    .into_response()
}

fn render_form<F: Serialize>(
    page: &'static str,
    context: &RequestContext,
    form: &F,
    errors: &FormErrors,
    object: Option<Value>,
) -> Response {
    let mut data = json!({ "form": form, "errors": errors });
    if let Some(object) = object {
        data["object"] = object;
    }
    render(page, context, data)
}

/// Parses a primary key path segment; anything but digits is a miss
fn parse_pk(raw: &str, kind: &str) -> Result<u64> {
    let not_found = || AppError::NotFound(format!("{kind} {raw}"));
    // `u64::from_str` also takes a leading '+'
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_found());
    }
    raw.parse().map_err(|_| not_found())
}

fn load_blog(state: &AppState, raw_id: &str) -> Result<Blog> {
    let id = parse_pk(raw_id, "blog")?;
    database::get_blog(&state.db, id)?.ok_or_else(|| AppError::NotFound(format!("blog {id}")))
}

fn load_article(state: &AppState, raw_id: &str) -> Result<Article> {
    let id = parse_pk(raw_id, "article")?;
    database::get_article(&state.db, id)?
        .ok_or_else(|| AppError::NotFound(format!("article {id}")))
}

/// Static landing page
pub async fn home() -> impl IntoResponse {
    Json(json!({ "page": "home" }))
}

/// Dashboard for the signed-in user
pub async fn admin_panel(Extension(ctx): Extension<RequestContext>) -> Response {
    render("admin_panel", &ctx, json!({}))
}

/// Lists the articles of the signed-in user's blog, newest first
///
/// Without an identity or an owned blog the list is empty; the page still
/// renders.
pub async fn article_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Response> {
    let articles = match ctx.owned_blog() {
        Some(blog) => database::articles_for_blog(&state.db, blog.id)?,
        None => Vec::new(),
    };

    Ok(render("article_list", &ctx, json!({ "object_list": articles })))
}

// -- Article creation --

/// Where a successful article creation leads, given the actor's blog
type ArticleSuccessUrl = fn(Option<&Blog>) -> String;

fn article_list_url(_: Option<&Blog>) -> String {
    route::ARTICLE_LIST.to_string()
}

fn public_page_url(blog: Option<&Blog>) -> String {
    match blog {
        Some(blog) => route::blog_public_url(&blog.url),
        None => route::ADMIN_PANEL.to_string(),
    }
}

fn show_article_create(page: &'static str, ctx: &RequestContext) -> Response {
    if ctx.owned_blog().is_none() {
        tracing::debug!(user_id = ?ctx.user_id(), "no owned blog, redirecting to article list");
        return Redirect::to(route::ARTICLE_LIST).into_response();
    }
    render_form(
        page,
        ctx,
        &ArticleForm::default(),
        &FormErrors::default(),
        None,
    )
}

async fn create_article(
    state: &AppState,
    ctx: &RequestContext,
    form: ArticleForm,
    page: &'static str,
    success_url: ArticleSuccessUrl,
) -> Result<Response> {
    let Some(blog) = ctx.owned_blog() else {
        tracing::debug!(user_id = ?ctx.user_id(), "no owned blog, redirecting to article list");
        return Ok(Redirect::to(route::ARTICLE_LIST).into_response());
    };

    let cleaned = match validation::clean_article_form(&form) {
        Ok(cleaned) => cleaned,
        Err(errors) => return Ok(render_form(page, ctx, &form, &errors, None)),
    };

    let article = database::create_article(&state.db, blog, &cleaned)?;
    tracing::info!(article_id = article.id, blog_id = blog.id, "article created");

    // The blog is resolved again so the redirect reflects what is stored now.
    let owned = match ctx.user_id() {
        Some(user_id) => database::blog_by_administrator(&state.db, user_id)?,
        None => None,
    };
    Ok(Redirect::to(&success_url(owned.as_ref())).into_response())
}

/// Empty article form, or a redirect to the list when the actor has no blog
pub async fn article_add_form(Extension(ctx): Extension<RequestContext>) -> Response {
    show_article_create("form_article_add", &ctx)
}

/// Creates an article on the actor's blog, then goes back to the list
pub async fn article_add(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<ArticleForm>,
) -> Result<Response> {
    create_article(&state, &ctx, form, "form_article_add", article_list_url).await
}

/// Wizard step 2 form, guarded like the regular article form
pub async fn wizard_article_form(Extension(ctx): Extension<RequestContext>) -> Response {
    show_article_create("wizard_article_add", &ctx)
}

/// Last wizard step: the first article, then the public page
pub async fn wizard_article_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<ArticleForm>,
) -> Result<Response> {
    create_article(&state, &ctx, form, "wizard_article_add", public_page_url).await
}

// -- Article update / delete --

/// Article form pre-filled from the stored record
pub async fn article_update_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let article = load_article(&state, &id)?;
    Ok(render_form(
        "form_article_update",
        &ctx,
        &ArticleForm::from(&article),
        &FormErrors::default(),
        Some(json!(article)),
    ))
}

/// Saves article changes, then goes back to the list
// TODO: check that the article belongs to the actor's blog once ownership
// is enforced beyond the authenticating proxy.
pub async fn article_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Form(form): Form<ArticleForm>,
) -> Result<Response> {
    let article = load_article(&state, &id)?;

    let cleaned = match validation::clean_article_form(&form) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return Ok(render_form(
                "form_article_update",
                &ctx,
                &form,
                &errors,
                Some(json!(article)),
            ))
        }
    };

    let updated = database::update_article(&state.db, &article, &cleaned)?;
    tracing::info!(article_id = updated.id, user_id = ?ctx.user_id(), "article updated");

    Ok(Redirect::to(route::ARTICLE_LIST).into_response())
}

/// Confirmation page shown before an article is deleted
pub async fn article_delete_confirm(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let article = load_article(&state, &id)?;
    Ok(render("form_article_delete", &ctx, json!({ "object": article })))
}

/// Deletes an article, then goes back to the list
pub async fn article_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let article = load_article(&state, &id)?;
    database::delete_article(&state.db, &article)?;
    tracing::info!(article_id = article.id, user_id = ?ctx.user_id(), "article deleted");

    Ok(Redirect::to(route::ARTICLE_LIST).into_response())
}

// -- Blog creation --

/// Where a successful blog creation leads
type BlogSuccessUrl = fn(&Blog) -> String;

fn article_add_url(_: &Blog) -> String {
    route::ARTICLE_ADD.to_string()
}

fn wizard_next_step_url(_: &Blog) -> String {
    route::WIZARD_ARTICLE_CREATE.to_string()
}

/// Sends an actor who already owns a blog to its update form
fn redirect_existing_blog(ctx: &RequestContext) -> Option<Response> {
    let blog = ctx.owned_blog()?;
    tracing::debug!(blog_id = blog.id, "blog already exists, redirecting to update");
    Some(Redirect::to(&route::blog_update_url(blog.id)).into_response())
}

fn show_blog_create(page: &'static str, ctx: &RequestContext) -> Response {
    if let Some(redirect) = redirect_existing_blog(ctx) {
        return redirect;
    }
    render_form(page, ctx, &BlogForm::default(), &FormErrors::default(), None)
}

async fn create_blog(
    state: &AppState,
    ctx: &RequestContext,
    form: BlogForm,
    page: &'static str,
    success_url: BlogSuccessUrl,
) -> Result<Response> {
    if let Some(redirect) = redirect_existing_blog(ctx) {
        return Ok(redirect);
    }
    let Some(user_id) = ctx.user_id() else {
        tracing::warn!("blog submitted without identity, redirecting to admin panel");
        return Ok(Redirect::to(route::ADMIN_PANEL).into_response());
    };

    let cleaned = match validation::validate_blog(&state.db, &form, Some(user_id), None) {
        Ok(cleaned) => cleaned,
        Err(AppError::Validation(errors)) => {
            return Ok(render_form(page, ctx, &form, &errors, None))
        }
        Err(err) => return Err(err),
    };

    let blog = database::create_blog(&state.db, &cleaned, user_id)?;
    tracing::info!(blog_id = blog.id, url = %blog.url, administrator = %blog.administrator, "blog created");

    Ok(Redirect::to(&success_url(&blog)).into_response())
}

/// Empty blog form, or a redirect to the update form for existing owners
pub async fn blog_add_form(Extension(ctx): Extension<RequestContext>) -> Response {
    show_blog_create("form_blog_add", &ctx)
}

/// Creates the actor's blog, then continues to the article form
pub async fn blog_add(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<BlogForm>,
) -> Result<Response> {
    create_blog(&state, &ctx, form, "form_blog_add", article_add_url).await
}

/// Wizard step 1 form
pub async fn wizard_blog_form(Extension(ctx): Extension<RequestContext>) -> Response {
    show_blog_create("wizard_blog_add", &ctx)
}

/// First wizard step: create the blog, then write the first article
pub async fn wizard_blog_create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Form(form): Form<BlogForm>,
) -> Result<Response> {
    create_blog(&state, &ctx, form, "wizard_blog_add", wizard_next_step_url).await
}

// -- Blog update --

/// Blog form pre-filled from the stored record
pub async fn blog_update_form(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let blog = load_blog(&state, &id)?;
    Ok(render_form(
        "form_blog_update",
        &ctx,
        &BlogForm::from(&blog),
        &FormErrors::default(),
        Some(json!(blog)),
    ))
}

/// Saves blog changes, then goes to the article list
pub async fn blog_update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Form(form): Form<BlogForm>,
) -> Result<Response> {
    let blog = load_blog(&state, &id)?;

    let cleaned = match validation::validate_blog(&state.db, &form, ctx.user_id(), Some(blog.id)) {
        Ok(cleaned) => cleaned,
        Err(AppError::Validation(errors)) => {
            return Ok(render_form(
                "form_blog_update",
                &ctx,
                &form,
                &errors,
                Some(json!(blog)),
            ))
        }
        Err(err) => return Err(err),
    };

    let updated = database::update_blog(&state.db, &blog, &cleaned)?;
    tracing::info!(blog_id = updated.id, url = %updated.url, "blog updated");

    Ok(Redirect::to(route::ARTICLE_LIST).into_response())
}

// -- Public page --

/// Public page of a blog, open to every visitor
pub async fn blog_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    let not_found = || AppError::NotFound(format!("blog {slug:?}"));
    if !validation::is_valid_blog_url(&slug) {
        return Err(not_found());
    }

    let blog = database::blog_by_url(&state.db, &slug)?.ok_or_else(not_found)?;
    let articles = database::articles_for_blog(&state.db, blog.id)?;
    let user_id = state.identity.current_identity(&headers);
    let blog = BlogWithArticles { blog, articles };

    Ok(Json(json!({
        "page": "blog_public",
        "user_id": user_id,
        "blog": blog,
    }))
    .into_response())
}
