use async_trait::async_trait;
use serde_json::Value;

use crate::clients::{ClientError, RankedComment, SourceContent, SourceContentFetcher};

/// Public forum endpoints reject requests without a browser user agent.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_TOP_COMMENTS: usize = 5;

/// Fetches a forum post and its comment tree via the site's `.json` view.
#[derive(Debug, Clone)]
pub struct ForumFetcher {
    client: reqwest::Client,
    top_comments: usize,
}

impl ForumFetcher {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().user_agent(BROWSER_UA).build()?;
        Ok(Self {
            client,
            top_comments: DEFAULT_TOP_COMMENTS,
        })
    }
}

#[async_trait]
impl SourceContentFetcher for ForumFetcher {
    async fn fetch(&self, reference: &str) -> Result<SourceContent, ClientError> {
        let url = format!("{}.json", reference.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json, text/html, */*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let value: Value = response.json().await?;
        extract_content(&value, self.top_comments)
    }
}

/// Pull title, selftext and the top-N comments (by upvotes) out of the
/// two-listing JSON document the `.json` view returns.
pub(crate) fn extract_content(value: &Value, top_n: usize) -> Result<SourceContent, ClientError> {
    let post = value
        .get(0)
        .and_then(|listing| listing.pointer("/data/children/0/data"))
        .ok_or_else(|| ClientError::Malformed("missing post listing".into()))?;

    let title = post
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::Malformed("post has no title".into()))?
        .to_owned();
    let description = post
        .get("selftext")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let mut comments: Vec<RankedComment> = value
        .get(1)
        .and_then(|listing| listing.pointer("/data/children"))
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| {
                    let data = child.get("data")?;
                    let text = data.get("body")?.as_str()?.to_owned();
                    let upvotes = data.get("ups").and_then(Value::as_i64).unwrap_or(0);
                    Some(RankedComment { text, upvotes })
                })
                .collect()
        })
        .unwrap_or_default();

    comments.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
    comments.truncate(top_n);

    Ok(SourceContent {
        title,
        description,
        ranked_comments: comments,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn listing_fixture() -> Value {
        json!([
            {
                "data": { "children": [ { "data": {
                    "title": "My cat learned to open doors",
                    "selftext": "It started with the pantry."
                } } ] }
            },
            {
                "data": { "children": [
                    { "data": { "body": "mine does this too", "ups": 12 } },
                    { "data": { "body": "get a lock", "ups": 431 } },
                    { "data": { "body": "pics or it didn't happen", "ups": 97 } },
                    { "data": { "kind": "more" } }
                ] }
            }
        ])
    }

    #[test]
    fn extracts_title_and_description() {
        let content = extract_content(&listing_fixture(), 5).unwrap();
        assert_eq!(content.title, "My cat learned to open doors");
        assert_eq!(content.description, "It started with the pantry.");
    }

    #[test]
    fn comments_are_ranked_by_upvotes_and_truncated() {
        let content = extract_content(&listing_fixture(), 2).unwrap();
        assert_eq!(content.ranked_comments.len(), 2);
        assert_eq!(content.ranked_comments[0].text, "get a lock");
        assert_eq!(content.ranked_comments[0].upvotes, 431);
        assert_eq!(content.ranked_comments[1].upvotes, 97);
    }

    #[test]
    fn non_comment_children_are_skipped() {
        let content = extract_content(&listing_fixture(), 10).unwrap();
        assert_eq!(content.ranked_comments.len(), 3);
    }

    #[test]
    fn missing_post_is_malformed() {
        let err = extract_content(&json!([]), 5).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn missing_selftext_defaults_to_empty() {
        let value = json!([
            { "data": { "children": [ { "data": { "title": "link post" } } ] } },
            { "data": { "children": [] } }
        ]);
        let content = extract_content(&value, 5).unwrap();
        assert_eq!(content.description, "");
        assert!(content.ranked_comments.is_empty());
    }
}
