//! Article model: a markdown blog post.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{resolve_slug, timestamp};
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    /// Markdown source
    pub content: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    /// Unset for drafts. A future date hides the article until then.
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating or fully replacing an article.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// A validated article ready to be written.
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub published_at: Option<String>,
}

impl ArticleRequest {
    pub fn validate(self) -> Result<ArticleDraft, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let slug = resolve_slug(self.slug.as_deref(), &title).map_err(AppError::Validation)?;

        let excerpt = self.excerpt.trim().to_string();
        if excerpt.is_empty() {
            return Err(AppError::Validation("Excerpt is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        Ok(ArticleDraft {
            title,
            slug,
            excerpt,
            content: self.content,
            tags: normalize_tags(self.tags),
            image: self.image.filter(|url| !url.trim().is_empty()),
            published_at: self.published_at.map(timestamp),
        })
    }
}

/// Trim tags, drop empty ones and keep the first occurrence of duplicates.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        let folded = tag.to_lowercase();
        if !tag.is_empty() && !seen.contains(&folded) {
            seen.push(folded);
            out.push(tag.to_string());
        }
    }
    out
}

/// Query parameters of the public article list.
#[derive(Debug, Default, Deserialize)]
pub struct ArticleListQuery {
    #[serde(default)]
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " chocolat ".to_string(),
            "".to_string(),
            "Chocolat".to_string(),
            "noël".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["chocolat", "noël"]);
    }

    #[test]
    fn test_normalize_tags_folds_accented_case() {
        let tags = vec!["Noël".to_string(), "NOËL".to_string(), "Crème".to_string()];
        assert_eq!(normalize_tags(tags), vec!["Noël", "Crème"]);
    }

    #[test]
    fn test_validate_article() {
        let request: ArticleRequest = serde_json::from_value(json!({
            "title": "Mes astuces pour la pâte feuilletée",
            "excerpt": "Tourage sans stress",
            "content": "# Tourage\n\nGardez tout au frais.",
            "publishedAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        let draft = request.validate().unwrap();
        assert_eq!(draft.slug, "mes-astuces-pour-la-pate-feuilletee");
        assert_eq!(draft.published_at.as_deref(), Some("2024-03-01T10:00:00.000Z"));
    }

    #[test]
    fn test_content_required() {
        let request: ArticleRequest = serde_json::from_value(json!({
            "title": "Vide",
            "excerpt": "Rien",
            "content": "  "
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
