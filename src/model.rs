//! Data models for the blog application
//!
//! Stored records, the forms users are allowed to submit, and the per-request
//! context handed to every identity-aware handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single owner's public, URL-addressed publishing unit
///
/// At most one Blog exists per `administrator`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Blog {
    /// Primary key
    pub id: u64,

    /// Public slug, lowercase alphanumerics and internal hyphens (max 25 chars)
    pub url: String,

    /// Display name of the blog (max 25 chars)
    pub title: String,

    /// Identity-provider user id of the owner
    pub administrator: String,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// A text post belonging to exactly one Blog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Article {
    pub id: u64,

    /// Max 50 chars
    pub title: String,

    /// Max 1000 chars
    pub text: String,

    /// Always the owning blog's administrator, never taken from user input
    pub author: String,

    /// Primary key of the owning Blog
    pub blog: u64,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Form payload for creating or updating a Blog
///
/// Missing fields deserialize as empty strings so they surface as
/// "required" validation errors.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct BlogForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

impl From<&Blog> for BlogForm {
    fn from(blog: &Blog) -> Self {
        Self {
            url: blog.url.clone(),
            title: blog.title.clone(),
        }
    }
}

/// Form payload for creating or updating an Article
///
/// Only `title` and `text` are bound; any other submitted field is ignored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ArticleForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl From<&Article> for ArticleForm {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            text: article.text.clone(),
        }
    }
}

/// The signed-in actor as seen by the current request
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,

    /// The Blog this actor administers, if any
    pub blog: Option<Blog>,

    pub url_logout: String,
}

/// Per-request context resolved before identity-aware handlers run
///
/// Serializes to nothing when no identity is present, otherwise to
/// `user_id`, `blog` and `url_logout`.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    #[serde(flatten)]
    pub actor: Option<Actor>,
}

impl RequestContext {
    pub fn user_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|actor| actor.user_id.as_str())
    }

    pub fn owned_blog(&self) -> Option<&Blog> {
        self.actor.as_ref().and_then(|actor| actor.blog.as_ref())
    }
}

/// A Blog together with its articles, newest first
#[derive(Serialize, Debug, Clone)]
pub struct BlogWithArticles {
    #[serde(flatten)]
    pub blog: Blog,
    pub articles: Vec<Article>,
}
