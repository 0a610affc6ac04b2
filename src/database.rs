//! Database initialization, table definitions and record operations
//!
//! Blogs and articles live in an embedded redb database as JSON strings keyed
//! by a numeric primary key. Secondary index tables map administrators and
//! urls to blogs, and blogs to their articles in creation order.

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::model::{Article, ArticleForm, Blog, BlogForm};

/// Blog records
///
/// Key: blog id
/// Value: JSON-serialized Blog
pub const TABLE_BLOGS: TableDefinition<u64, &str> = TableDefinition::new("blogs_v1");

/// Article records
///
/// Key: article id
/// Value: JSON-serialized Article
pub const TABLE_ARTICLES: TableDefinition<u64, &str> = TableDefinition::new("articles_v1");

/// Index: administrator user id -> blog id
pub const TABLE_BLOG_ADMINS: TableDefinition<&str, u64> = TableDefinition::new("blog_admins_v1");

/// Index: blog url -> blog id
pub const TABLE_BLOG_URLS: TableDefinition<&str, u64> = TableDefinition::new("blog_urls_v1");

/// Index of articles per blog
///
/// Key: composite key "{blog_id:020}:{created_micros:020}:{article_id:020}"
/// Value: article id
///
/// Zero padding keeps the lexicographic order numeric, so a reverse range
/// scan over one blog's prefix yields its articles newest first.
pub const TABLE_BLOG_ARTICLES: TableDefinition<&str, u64> =
    TableDefinition::new("blog_articles_v1");

/// Last issued primary key per entity
pub const TABLE_SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences_v1");

const BLOG_SEQUENCE: &str = "blog";
const ARTICLE_SEQUENCE: &str = "article";

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    /// Resolves the signed-in user of a request
    pub identity: Arc<dyn IdentityProvider>,
}

/// Creates or opens the database file and makes sure every table exists
///
/// # Example
///
/// ```no_run
/// # use blogsteps::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> std::result::Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_BLOGS)?;
        write_txn.open_table(TABLE_ARTICLES)?;
        write_txn.open_table(TABLE_BLOG_ADMINS)?;
        write_txn.open_table(TABLE_BLOG_URLS)?;
        write_txn.open_table(TABLE_BLOG_ARTICLES)?;
        write_txn.open_table(TABLE_SEQUENCES)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64> {
    let mut table = txn.open_table(TABLE_SEQUENCES)?;
    let next = table.get(sequence)?.map(|v| v.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

fn article_index_key(article: &Article) -> String {
    format!(
        "{:020}:{:020}:{:020}",
        article.blog,
        article.created.timestamp_micros(),
        article.id
    )
}

/// Range bounds covering every index key of one blog
fn blog_article_range(blog_id: u64) -> (String, String) {
    // '{' sorts after ':' so the end key closes the prefix
    (format!("{:020}:", blog_id), format!("{:020}:{{", blog_id))
}

/// Inserts a new Blog owned by `administrator`
///
/// Expects an already cleaned form. Ownership and url checks happen in the
/// validation layer before this is called.
pub fn create_blog(db: &Database, form: &BlogForm, administrator: &str) -> Result<Blog> {
    let now = Utc::now();
    let write_txn = db.begin_write()?;
    let blog = {
        let blog = Blog {
            id: next_id(&write_txn, BLOG_SEQUENCE)?,
            url: form.url.clone(),
            title: form.title.clone(),
            administrator: administrator.to_string(),
            created: now,
            modified: now,
        };
        let record_json = serde_json::to_string(&blog)?;

        let mut blogs = write_txn.open_table(TABLE_BLOGS)?;
        blogs.insert(blog.id, record_json.as_str())?;

        let mut admins = write_txn.open_table(TABLE_BLOG_ADMINS)?;
        admins.insert(blog.administrator.as_str(), blog.id)?;

        let mut urls = write_txn.open_table(TABLE_BLOG_URLS)?;
        urls.insert(blog.url.as_str(), blog.id)?;

        blog
    };
    write_txn.commit()?;

    Ok(blog)
}

pub fn get_blog(db: &Database, id: u64) -> Result<Option<Blog>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_BLOGS)?;
    let blog = match table.get(id)? {
        Some(value) => Some(decode(value.value())?),
        None => None,
    };
    Ok(blog)
}

/// Looks up a Blog through one of the string-keyed index tables
fn blog_by_index(
    db: &Database,
    index: TableDefinition<'static, &'static str, u64>,
    key: &str,
) -> Result<Option<Blog>> {
    let read_txn = db.begin_read()?;
    let id = read_txn.open_table(index)?.get(key)?.map(|v| v.value());
    let Some(id) = id else {
        return Ok(None);
    };

    let table = read_txn.open_table(TABLE_BLOGS)?;
    let blog = match table.get(id)? {
        Some(value) => Some(decode(value.value())?),
        None => None,
    };
    Ok(blog)
}

/// Returns the Blog administered by the given identity, if any
pub fn blog_by_administrator(db: &Database, administrator: &str) -> Result<Option<Blog>> {
    blog_by_index(db, TABLE_BLOG_ADMINS, administrator)
}

/// Returns the Blog published under the given url, if any
pub fn blog_by_url(db: &Database, url: &str) -> Result<Option<Blog>> {
    blog_by_index(db, TABLE_BLOG_URLS, url)
}

/// Lists all blogs, most recently modified first
pub fn list_blogs(db: &Database) -> Result<Vec<Blog>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_BLOGS)?;

    let mut blogs = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        blogs.push(decode::<Blog>(value.value())?);
    }
    blogs.sort_by(|a, b| b.modified.cmp(&a.modified).then(b.id.cmp(&a.id)));

    Ok(blogs)
}

/// Stores a cleaned form over an existing Blog and refreshes `modified`
pub fn update_blog(db: &Database, blog: &Blog, form: &BlogForm) -> Result<Blog> {
    let updated = Blog {
        url: form.url.clone(),
        title: form.title.clone(),
        modified: Utc::now(),
        ..blog.clone()
    };
    let record_json = serde_json::to_string(&updated)?;

    let write_txn = db.begin_write()?;
    {
        let mut blogs = write_txn.open_table(TABLE_BLOGS)?;
        blogs.insert(updated.id, record_json.as_str())?;

        let mut urls = write_txn.open_table(TABLE_BLOG_URLS)?;
        if blog.url != updated.url {
            let points_here = urls.get(blog.url.as_str())?.map(|v| v.value()) == Some(blog.id);
            if points_here {
                urls.remove(blog.url.as_str())?;
            }
        }
        urls.insert(updated.url.as_str(), updated.id)?;
    }
    write_txn.commit()?;

    Ok(updated)
}

/// Deletes a Blog and every Article that belongs to it
///
/// Returns `false` if no Blog has the given id.
pub fn delete_blog(db: &Database, id: u64) -> Result<bool> {
    let Some(blog) = get_blog(db, id)? else {
        return Ok(false);
    };

    let write_txn = db.begin_write()?;
    {
        let mut blogs = write_txn.open_table(TABLE_BLOGS)?;
        blogs.remove(blog.id)?;

        let mut admins = write_txn.open_table(TABLE_BLOG_ADMINS)?;
        let admin_points_here =
            admins.get(blog.administrator.as_str())?.map(|v| v.value()) == Some(blog.id);
        if admin_points_here {
            admins.remove(blog.administrator.as_str())?;
        }

        let mut urls = write_txn.open_table(TABLE_BLOG_URLS)?;
        let url_points_here = urls.get(blog.url.as_str())?.map(|v| v.value()) == Some(blog.id);
        if url_points_here {
            urls.remove(blog.url.as_str())?;
        }

        let mut index = write_txn.open_table(TABLE_BLOG_ARTICLES)?;
        let (start_key, end_key) = blog_article_range(blog.id);
        let entries = index
            .range(start_key.as_str()..end_key.as_str())?
            .map(|entry| entry.map(|(key, value)| (key.value().to_string(), value.value())))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut articles = write_txn.open_table(TABLE_ARTICLES)?;
        for (key, article_id) in &entries {
            index.remove(key.as_str())?;
            articles.remove(*article_id)?;
        }

        tracing::debug!(blog_id = blog.id, articles = entries.len(), "cascading blog delete");
    }
    write_txn.commit()?;

    Ok(true)
}

/// Inserts a new Article under `blog`
///
/// `author` and `blog` are always taken from the owning Blog.
pub fn create_article(db: &Database, blog: &Blog, form: &ArticleForm) -> Result<Article> {
    let now = Utc::now();
    let write_txn = db.begin_write()?;
    let article = {
        let article = Article {
            id: next_id(&write_txn, ARTICLE_SEQUENCE)?,
            title: form.title.clone(),
            text: form.text.clone(),
            author: blog.administrator.clone(),
            blog: blog.id,
            created: now,
            modified: now,
        };
        let record_json = serde_json::to_string(&article)?;

        let mut articles = write_txn.open_table(TABLE_ARTICLES)?;
        articles.insert(article.id, record_json.as_str())?;

        let mut index = write_txn.open_table(TABLE_BLOG_ARTICLES)?;
        index.insert(article_index_key(&article).as_str(), article.id)?;

        article
    };
    write_txn.commit()?;

    Ok(article)
}

pub fn get_article(db: &Database, id: u64) -> Result<Option<Article>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_ARTICLES)?;
    let article = match table.get(id)? {
        Some(value) => Some(decode(value.value())?),
        None => None,
    };
    Ok(article)
}

/// Stores a cleaned form over an existing Article and refreshes `modified`
pub fn update_article(db: &Database, article: &Article, form: &ArticleForm) -> Result<Article> {
    let updated = Article {
        title: form.title.clone(),
        text: form.text.clone(),
        modified: Utc::now(),
        ..article.clone()
    };
    let record_json = serde_json::to_string(&updated)?;

    let write_txn = db.begin_write()?;
    {
        let mut articles = write_txn.open_table(TABLE_ARTICLES)?;
        articles.insert(updated.id, record_json.as_str())?;
    }
    write_txn.commit()?;

    Ok(updated)
}

pub fn delete_article(db: &Database, article: &Article) -> Result<()> {
    let write_txn = db.begin_write()?;
    {
        let mut articles = write_txn.open_table(TABLE_ARTICLES)?;
        articles.remove(article.id)?;

        let mut index = write_txn.open_table(TABLE_BLOG_ARTICLES)?;
        index.remove(article_index_key(article).as_str())?;
    }
    write_txn.commit()?;

    Ok(())
}

/// Lists the articles of one blog, newest first
pub fn articles_for_blog(db: &Database, blog_id: u64) -> Result<Vec<Article>> {
    let read_txn = db.begin_read()?;
    let index = read_txn.open_table(TABLE_BLOG_ARTICLES)?;
    let table = read_txn.open_table(TABLE_ARTICLES)?;

    let (start_key, end_key) = blog_article_range(blog_id);
    let mut articles = Vec::new();
    for entry in index.range(start_key.as_str()..end_key.as_str())?.rev() {
        let (_, article_id) = entry?;
        if let Some(value) = table.get(article_id.value())? {
            articles.push(decode::<Article>(value.value())?);
        }
    }

    Ok(articles)
}
