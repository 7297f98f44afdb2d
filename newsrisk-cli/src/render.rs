//! Plain-text rendering of query results.

use std::fmt::Write;

use newsrisk_core::TaggedArticle;

/// Render the "Showing N articles" listing.
pub fn render_articles(articles: &[&TaggedArticle]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Showing {} articles", articles.len());
    for article in articles {
        let tags = article.risk_tags().to_field();
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", article.article.title);
        let _ = writeln!(
            out,
            "  Vendor: {} | Date: {} | Risk Tags: {}",
            article.vendor(),
            article.published().date_naive(),
            if tags.is_empty() { "None" } else { tags.as_str() }
        );
        let _ = writeln!(out, "  {}", article.article.url);
        if article.review_flag() {
            let _ = writeln!(out, "  Needs review: no clear risk tags found");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use newsrisk_core::{CanonicalArticle, RiskTags};

    fn article(tags: &str) -> TaggedArticle {
        TaggedArticle::new(
            CanonicalArticle {
                vendor: "Okta".into(),
                title: "Okta news".into(),
                published: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
                url: "https://news.example/1".into(),
                description: String::new(),
            },
            RiskTags::parse_field(tags),
        )
    }

    #[test]
    fn test_render_tagged_and_review() {
        let tagged = article("Data Breach, Lawsuit");
        let flagged = article("");
        let text = render_articles(&[&tagged, &flagged]);

        assert!(text.starts_with("Showing 2 articles\n"));
        assert!(text.contains("Vendor: Okta | Date: 2024-05-01 | Risk Tags: Data Breach, Lawsuit"));
        assert!(text.contains("Risk Tags: None"));
        assert_eq!(text.matches("Needs review").count(), 1);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_articles(&[]), "Showing 0 articles\n");
    }
}
