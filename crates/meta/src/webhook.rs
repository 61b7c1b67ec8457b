//! Meta webhook contract: the subscription handshake and the delivery payload.

use serde::Deserialize;
use serde_json::Value;

/// Query parameters of the `GET` verification handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Return the challenge to echo when the handshake is valid.
///
/// Valid means `hub.mode=subscribe` and a verify token equal to `expected`.
/// An empty `expected` never verifies.
pub fn verify_subscription(query: &VerifyQuery, expected: &str) -> Option<String> {
    if expected.is_empty() {
        return None;
    }
    match (&query.mode, &query.verify_token) {
        (Some(mode), Some(token)) if mode == "subscribe" && token == expected => {
            Some(query.challenge.clone().unwrap_or_default())
        }
        _ => None,
    }
}

/// One webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

/// A "video is now live" notification extracted from a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPublished {
    pub video_id: String,
    pub post_id: Option<String>,
    pub link: Option<String>,
}

impl WebhookChange {
    /// Recognise a published-video feed change.
    ///
    /// Requires `field == "feed"`, `value.item == "video"`, a verb of `add`
    /// or `edited`, and either `published == 1` or `status == "published"`.
    pub fn video_published(&self) -> Option<VideoPublished> {
        if self.field != "feed" {
            return None;
        }
        let value = &self.value;
        if value.get("item").and_then(Value::as_str) != Some("video") {
            return None;
        }
        if !matches!(
            value.get("verb").and_then(Value::as_str),
            Some("add") | Some("edited")
        ) {
            return None;
        }

        let published_flag = match value.get("published") {
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::Bool(b)) => *b,
            _ => false,
        };
        let published_status = value
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("published"));
        if !published_flag && !published_status {
            return None;
        }

        Some(VideoPublished {
            video_id: string_field(value, "video_id")?,
            post_id: string_field(value, "post_id"),
            link: string_field(value, "link").filter(|l| !l.is_empty()),
        })
    }
}

impl WebhookPayload {
    /// Every published-video event in delivery order.
    pub fn published_videos(&self) -> impl Iterator<Item = VideoPublished> + '_ {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .filter_map(WebhookChange::video_published)
    }
}

/// Public URL of a Facebook reel when the webhook carries no link.
pub fn facebook_reel_url(video_id: &str) -> String {
    format!("https://www.facebook.com/reel/{video_id}")
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
