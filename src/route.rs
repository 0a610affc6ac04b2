//! Route definitions for the blog application
//!
//! Configures the router and provides reverse lookups for the paths that
//! handlers redirect to.

use axum::middleware;
use axum::routing::get;
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    admin_panel, article_add, article_add_form, article_delete, article_delete_confirm,
    article_list, article_update, article_update_form, blog_add, blog_add_form, blog_public,
    blog_update, blog_update_form, home, wizard_article_create, wizard_article_form,
    wizard_blog_create, wizard_blog_form,
};
use crate::middleware::resolve_context;

pub const HOME: &str = "/";
pub const WIZARD_BLOG_CREATE: &str = "/wizard/2-steps-to-go/";
pub const WIZARD_ARTICLE_CREATE: &str = "/wizard/1-step-to-go/";
pub const ADMIN_PANEL: &str = "/administration/";
pub const ARTICLE_LIST: &str = "/administration/article-list/";
pub const ARTICLE_ADD: &str = "/administration/article/add/";
pub const BLOG_ADD: &str = "/administration/blog/add/";

pub fn blog_update_url(id: u64) -> String {
    format!("/administration/blog/update/{id}/")
}

pub fn blog_public_url(url: &str) -> String {
    format!("/{url}/")
}

/// Creates the application router
///
/// # Route Definitions
///
/// - `GET /` - Landing page (public)
/// - `GET|POST /wizard/2-steps-to-go/` - Wizard step 1, create a blog
/// - `GET|POST /wizard/1-step-to-go/` - Wizard step 2, write the first article
/// - `GET /administration/` - Dashboard
/// - `GET /administration/article-list/` - Articles of the signed-in user's blog
/// - `GET|POST /administration/article/add/` - Create an article
/// - `GET|POST /administration/article/update/{id}/` - Edit an article
/// - `GET|POST /administration/article/delete/{id}/` - Confirm and delete an article
/// - `GET|POST /administration/blog/add/` - Create the user's blog
/// - `GET|POST /administration/blog/update/{id}/` - Edit a blog
/// - `GET /{slug}/` - Public blog page
///
/// Every route except the two public ones runs behind `resolve_context`.
///
/// # Example Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use axum::http::HeaderName;
/// # use blogsteps::database::{init_db, AppState};
/// # use blogsteps::identity::HeaderIdentity;
/// # use blogsteps::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let identity = HeaderIdentity::new(HeaderName::from_static("x-user-id"), "/logout");
/// let state = AppState { db: Arc::new(db), identity: Arc::new(identity) };
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(WIZARD_BLOG_CREATE, get(wizard_blog_form).post(wizard_blog_create))
        .route(
            WIZARD_ARTICLE_CREATE,
            get(wizard_article_form).post(wizard_article_create),
        )
        .route(ADMIN_PANEL, get(admin_panel))
        .route(ARTICLE_LIST, get(article_list))
        .route(ARTICLE_ADD, get(article_add_form).post(article_add))
        .route(
            "/administration/article/update/{id}/",
            get(article_update_form).post(article_update),
        )
        .route(
            "/administration/article/delete/{id}/",
            get(article_delete_confirm).post(article_delete),
        )
        .route(BLOG_ADD, get(blog_add_form).post(blog_add))
        .route(
            "/administration/blog/update/{id}/",
            get(blog_update_form).post(blog_update),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_context));

    Router::new()
        .route(HOME, get(home))
        .route("/{slug}/", get(blog_public))
        .merge(admin_routes)
        .with_state(state)
}
