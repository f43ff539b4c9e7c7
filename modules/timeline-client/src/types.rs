use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author info nested inside a timeline post.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// A single post from the user timeline endpoint.
///
/// Only the fields the harvester reads are typed. Everything else the API
/// returned is kept verbatim in `rest`, so re-serializing a post reproduces
/// the full source document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelinePost {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PostAuthor>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

impl TimelinePost {
    /// Returns whichever text field is populated, preferring `full_text`.
    /// Extended mode puts the untruncated body there.
    pub fn content(&self) -> Option<&str> {
        self.full_text.as_deref().or(self.text.as_deref())
    }
}

/// Error body shape: `{"errors":[{"code":88,"message":"Rate limit exceeded"}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

/// One entry of an error body's `errors` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEntry {
    pub code: Option<i64>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_extended_post_and_keeps_unknown_fields() {
        let raw = r#"{
            "id": 1050118621198921728,
            "id_str": "1050118621198921728",
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "full_text": "To make room for more expression, we will now count all emojis as equal.",
            "truncated": false,
            "retweet_count": 12,
            "user": {"screen_name": "xdevelopers", "name": "Developers", "verified": true}
        }"#;

        let post: TimelinePost = serde_json::from_str(raw).unwrap();
        assert_eq!(post.id, 1050118621198921728);
        let author = post.user.as_ref().unwrap();
        assert_eq!(author.screen_name.as_deref(), Some("xdevelopers"));
        assert!(post.content().unwrap().starts_with("To make room"));
        assert_eq!(post.rest["retweet_count"], 12);
        assert_eq!(post.rest["id_str"], "1050118621198921728");

        // Round-trip keeps the untyped fields.
        let back = serde_json::to_value(&post).unwrap();
        assert_eq!(back["truncated"], false);
        assert_eq!(back["user"]["verified"], true);
    }

    #[test]
    fn falls_back_to_text_when_full_text_missing() {
        let raw = r#"{"id": 7, "text": "short form"}"#;
        let post: TimelinePost = serde_json::from_str(raw).unwrap();
        assert_eq!(post.content(), Some("short form"));
    }

    #[test]
    fn decodes_rate_limit_error_body() {
        let raw = r#"{"errors":[{"code":88,"message":"Rate limit exceeded"}]}"#;
        let body: ApiErrorBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.errors[0].code, Some(88));
        assert_eq!(body.errors[0].message.as_deref(), Some("Rate limit exceeded"));
    }
}
