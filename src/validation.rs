//! Form cleaning and cross-record validation
//!
//! Field rules mirror the stored limits of each model. Cleaning trims every
//! value and lower-cases blog urls before the rules run.

use regex::Regex;
use redb::Database;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use crate::database;
use crate::error::AppError;
use crate::model::{ArticleForm, BlogForm};

pub const BLOG_URL_MAX_LENGTH: usize = 25;
pub const BLOG_TITLE_MAX_LENGTH: usize = 25;
pub const ARTICLE_TITLE_MAX_LENGTH: usize = 50;
pub const ARTICLE_TEXT_MAX_LENGTH: usize = 1000;

// Lowercase alphanumerics and internal hyphens, no leading or trailing hyphen.
//
// The public page route matches slugs with the same pattern.
static BLOG_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]+-*)+[a-z0-9]$").expect("BLOG_URL_PATTERN: invalid regex pattern")
});

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const BLOG_URL_PATTERN_MESSAGE: &str =
    "Only lowercase letters, numbers, or hyphens are admitted. It cannot start or end with a hyphen.";
pub const BLOG_URL_TAKEN_MESSAGE: &str = "This URL is already used by another blog.";

/// Field name -> messages, rendered back next to the form
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<&'static str, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Applies the required and max-length rules, returning `true` if both pass
fn check_text(errors: &mut FormErrors, field: &'static str, value: &str, max: usize) -> bool {
    if value.is_empty() {
        errors.add(field, REQUIRED_MESSAGE);
        return false;
    }

    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {length})."),
        );
        return false;
    }

    true
}

/// Returns `true` if `url` is a well-formed public blog slug
pub fn is_valid_blog_url(url: &str) -> bool {
    BLOG_URL_PATTERN.is_match(url)
}

/// Cleans the field-level rules of a Blog form
pub fn clean_blog_form(form: &BlogForm) -> Result<BlogForm, FormErrors> {
    let mut errors = FormErrors::default();
    let cleaned = BlogForm {
        url: form.url.trim().to_lowercase(),
        title: form.title.trim().to_string(),
    };

    if check_text(&mut errors, "url", &cleaned.url, BLOG_URL_MAX_LENGTH)
        && !is_valid_blog_url(&cleaned.url)
    {
        errors.add("url", BLOG_URL_PATTERN_MESSAGE);
    }
    check_text(&mut errors, "title", &cleaned.title, BLOG_TITLE_MAX_LENGTH);

    errors.into_result(cleaned)
}

/// Cleans the field-level rules of an Article form
pub fn clean_article_form(form: &ArticleForm) -> Result<ArticleForm, FormErrors> {
    let mut errors = FormErrors::default();
    let cleaned = ArticleForm {
        title: form.title.trim().to_string(),
        text: form.text.trim().to_string(),
    };

    check_text(&mut errors, "title", &cleaned.title, ARTICLE_TITLE_MAX_LENGTH);
    check_text(&mut errors, "text", &cleaned.text, ARTICLE_TEXT_MAX_LENGTH);

    errors.into_result(cleaned)
}

/// Cleans a Blog form and checks its url against the other blogs
///
/// A url already held by another Blog is rejected unless that Blog belongs to
/// `actor`. `editing` is the id of the Blog being updated, which never
/// conflicts with itself.
pub fn validate_blog(
    db: &Database,
    form: &BlogForm,
    actor: Option<&str>,
    editing: Option<u64>,
) -> crate::error::Result<BlogForm> {
    let cleaned = clean_blog_form(form).map_err(AppError::Validation)?;

    if let Some(existing) = database::blog_by_url(db, &cleaned.url)? {
        let same_blog = editing == Some(existing.id);
        let same_owner = actor == Some(existing.administrator.as_str());
        if !same_blog && !same_owner {
            let mut errors = FormErrors::default();
            errors.add("url", BLOG_URL_TAKEN_MESSAGE);
            return Err(AppError::Validation(errors));
        }
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_form(url: &str, title: &str) -> BlogForm {
        BlogForm {
            url: url.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn accepts_hyphenated_lowercase_url() {
        let cleaned = clean_blog_form(&blog_form("unit-test-blog", "Blog Testing")).unwrap();
        assert_eq!(cleaned.url, "unit-test-blog");
        assert_eq!(cleaned.title, "Blog Testing");
    }

    #[test]
    fn lowercases_url_before_matching() {
        let cleaned = clean_blog_form(&blog_form("My-Blog", "Mine")).unwrap();
        assert_eq!(cleaned.url, "my-blog");
    }

    #[test]
    fn rejects_malformed_urls() {
        for url in ["-leading", "trailing-", "with space", "under_score", "a", "dot.com"] {
            let errors = clean_blog_form(&blog_form(url, "Title")).unwrap_err();
            assert_eq!(
                errors.get("url"),
                Some(&[BLOG_URL_PATTERN_MESSAGE.to_string()][..]),
                "url {url:?} should be rejected"
            );
        }
    }

    #[test]
    fn allows_repeated_internal_hyphens() {
        assert!(is_valid_blog_url("a--b"));
        assert!(is_valid_blog_url("2-steps-to-go"));
        assert!(!is_valid_blog_url("UPPER"));
    }

    #[test]
    fn reports_required_fields() {
        let errors = clean_blog_form(&blog_form("   ", "")).unwrap_err();
        assert_eq!(errors.get("url"), Some(&[REQUIRED_MESSAGE.to_string()][..]));
        assert_eq!(errors.get("title"), Some(&[REQUIRED_MESSAGE.to_string()][..]));
    }

    #[test]
    fn enforces_max_lengths() {
        let long_url = "a".repeat(26);
        let errors = clean_blog_form(&blog_form(&long_url, "ok")).unwrap_err();
        assert_eq!(
            errors.get("url").unwrap()[0],
            "Ensure this value has at most 25 characters (it has 26)."
        );

        let form = ArticleForm {
            title: "t".repeat(51),
            text: "x".repeat(1000),
        };
        let errors = clean_article_form(&form).unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("text").is_none());
    }

    #[test]
    fn article_form_trims_values() {
        let form = ArticleForm {
            title: "  Hello ".to_string(),
            text: "\nbody\n".to_string(),
        };
        let cleaned = clean_article_form(&form).unwrap();
        assert_eq!(cleaned.title, "Hello");
        assert_eq!(cleaned.text, "body");
    }

    #[test]
    fn display_joins_messages() {
        let mut errors = FormErrors::default();
        errors.add("title", REQUIRED_MESSAGE);
        errors.add("text", REQUIRED_MESSAGE);
        assert_eq!(
            errors.to_string(),
            "text: This field is required.; title: This field is required."
        );
    }
}
