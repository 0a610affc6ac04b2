use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::database::{self, AppState};
use crate::error::AppError;
use crate::model::{Actor, RequestContext};
use crate::route;

/// Resolves the request context before identity-aware handlers run
///
/// Asks the identity provider for the current user and, if there is one,
/// loads the Blog they administer and a logout link back to the home page.
/// The resulting `RequestContext` is stored in the request extensions.
///
/// A missing identity is not rejected here. Each handler decides whether to
/// redirect or to render restricted content.
pub async fn resolve_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = match state.identity.current_identity(request.headers()) {
        Some(user_id) => {
            let blog = database::blog_by_administrator(&state.db, &user_id)?;
            Some(Actor {
                url_logout: state.identity.logout_url(route::HOME),
                user_id,
                blog,
            })
        }
        None => None,
    };

    request.extensions_mut().insert(RequestContext { actor });
    Ok(next.run(request).await)
}
