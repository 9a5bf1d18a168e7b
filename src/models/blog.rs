use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{null_as_default, Resource, Validate};
use crate::error::{Result, ValidationError};
use crate::gateway::{Gateway, Order, Query, RowId};

const TABLE: &str = "blog_posts";

/// Complete article row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: RowId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_published: bool,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing row without the article body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostSummary {
    pub id: RowId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_published: bool,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BlogPostDraft {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub author: String,
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BlogPostDraft {
    /// Sets `published_date` when the post goes from unpublished to published.
    /// Otherwise the existing date is kept.
    pub fn stamp_publication(&mut self, was_published: bool, now: DateTime<Utc>) {
        if self.is_published && !was_published {
            self.published_date = Some(now);
        }
        self.updated_at = Some(now);
    }

    /// Edit payload seeded from a stored post and its separately fetched body
    pub fn edit_of(post: &BlogPostSummary, content: String) -> Self {
        Self {
            title: post.title.clone(),
            summary: post.summary.clone(),
            content,
            author: post.author.clone(),
            is_published: post.is_published,
            published_date: post.published_date,
            updated_at: None,
        }
    }
}

impl Validate for BlogPostDraft {
    fn validate(&self) -> Result<()> {
        let mut v = ValidationError::new();
        v.require("title", &self.title);
        v.into_result()
    }
}

impl Resource for BlogPost {
    const TABLE: &'static str = TABLE;
    type Draft = BlogPostDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::desc("created_at")
    }
}

impl Resource for BlogPostSummary {
    const TABLE: &'static str = TABLE;
    type Draft = BlogPostDraft;

    fn id(&self) -> &RowId {
        &self.id
    }

    fn default_order() -> Order {
        Order::desc("created_at")
    }

    fn columns() -> Option<&'static [&'static str]> {
        Some(&[
            "id",
            "title",
            "summary",
            "author",
            "is_published",
            "published_date",
            "created_at",
        ])
    }
}

/// Body of one article, fetched on demand
pub async fn fetch_post_content(gateway: &dyn Gateway, id: &RowId) -> Result<Option<String>> {
    let query = Query::all()
        .columns(&["content"])
        .eq("id", id.to_value())
        .limit(1);
    let rows = gateway.select(TABLE, &query).await?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.get("content").and_then(Value::as_str).map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(published: bool) -> BlogPostDraft {
        BlogPostDraft {
            title: "Dry eyes in winter".into(),
            is_published: published,
            ..Default::default()
        }
    }

    #[test]
    fn publishing_sets_date_once() {
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();

        let mut d = draft(true);
        d.stamp_publication(false, first);
        assert_eq!(d.published_date, Some(first));

        // already published: keep the original date
        d.stamp_publication(true, later);
        assert_eq!(d.published_date, Some(first));
        assert_eq!(d.updated_at, Some(later));
    }

    #[test]
    fn unpublished_drafts_have_no_date() {
        let mut d = draft(false);
        d.stamp_publication(false, Utc::now());
        assert!(d.published_date.is_none());
        assert!(serde_json::to_value(&d).unwrap().get("published_date").is_none());
    }

    #[test]
    fn null_text_columns_read_as_empty() {
        let row = serde_json::json!({
            "id": 1,
            "title": null,
            "summary": null,
            "author": null,
            "is_published": null,
            "published_date": null
        });
        let post: BlogPostSummary = serde_json::from_value(row).unwrap();
        assert_eq!(post.title, "");
        assert_eq!(post.author, "");
        assert!(!post.is_published);
    }
}
