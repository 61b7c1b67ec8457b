//! Facebook page reels via the `video_reels` endpoint.
//!
//! Flow: `upload_phase=start` returns a video id, the bytes go to the upload
//! host, and `upload_phase=finish` either publishes or hands the reel to
//! Facebook's own scheduler via `scheduled_publish_time`.

use async_trait::async_trait;
use cadence_core::scheduling::facebook_supports_native_schedule;
use cadence_core::social::SocialIdentity;
use chrono::Utc;
use serde_json::Value;

use crate::client::{require_id, GraphClient};
use crate::error::PlatformError;
use crate::strategy::{
    Credentials, PlatformStrategy, PublishResult, ReelPost, ScheduleOutcome, VideoFile,
};

/// Upload service segment on the resumable upload host.
const UPLOAD_SERVICE: &str = "video-upload";

/// Base for relative `permalink_url` values.
const FACEBOOK_WEB_URL: &str = "https://www.facebook.com";

pub struct FacebookStrategy {
    client: GraphClient,
}

impl FacebookStrategy {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn finish_upload(
        &self,
        creds: &Credentials,
        video_id: &str,
        post: &ReelPost,
        schedule: bool,
    ) -> Result<(), PlatformError> {
        let mut params = vec![
            ("upload_phase", "finish".to_string()),
            ("video_id", video_id.to_string()),
            ("title", post.title.trim().to_string()),
            ("description", post.caption()),
        ];
        if schedule {
            params.push(("video_state", "SCHEDULED".to_string()));
            params.push((
                "scheduled_publish_time",
                post.scheduled_date.timestamp().to_string(),
            ));
        } else {
            params.push(("video_state", "PUBLISHED".to_string()));
        }

        let body = self
            .client
            .post(
                &format!("{}/video_reels", creds.account_id),
                &creds.access_token,
                &params,
            )
            .await?;

        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(PlatformError::Api {
                status: 200,
                message: format!("finish phase for video {video_id} was not accepted"),
            });
        }
        Ok(())
    }
}

/// Turn a `permalink_url` into an absolute URL.
pub fn absolute_permalink(permalink: &str) -> String {
    if permalink.starts_with("http://") || permalink.starts_with("https://") {
        permalink.to_string()
    } else {
        format!("{FACEBOOK_WEB_URL}/{}", permalink.trim_start_matches('/'))
    }
}

#[async_trait]
impl PlatformStrategy for FacebookStrategy {
    fn identity(&self) -> SocialIdentity {
        SocialIdentity::Facebook
    }

    async fn resolve_account_id(&self, access_token: &str) -> Result<String, PlatformError> {
        let body = self
            .client
            .get("me/accounts", access_token, &[("fields", "id,name".to_string())])
            .await?;

        body.get("data")
            .and_then(Value::as_array)
            .and_then(|pages| pages.first())
            .ok_or(PlatformError::MissingField("data"))
            .and_then(|page| require_id(page, "id"))
    }

    async fn create_container(
        &self,
        creds: &Credentials,
        _post: &ReelPost,
    ) -> Result<String, PlatformError> {
        let body = self
            .client
            .post(
                &format!("{}/video_reels", creds.account_id),
                &creds.access_token,
                &[("upload_phase", "start".to_string())],
            )
            .await?;

        let video_id = require_id(&body, "video_id")?;
        tracing::info!(page_id = %creds.account_id, video_id = %video_id, "Facebook reel upload started");
        Ok(video_id)
    }

    async fn upload_video(
        &self,
        creds: &Credentials,
        container_id: &str,
        video: &VideoFile,
    ) -> Result<(), PlatformError> {
        let url = self.client.upload_endpoint(UPLOAD_SERVICE, container_id);
        let body = self
            .client
            .upload_binary(&url, &creds.access_token, video.bytes.clone())
            .await?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(PlatformError::Api {
                status: 200,
                message: format!("upload of video {container_id} was not accepted"),
            });
        }
        tracing::info!(video_id = container_id, bytes = video.len(), "Facebook video uploaded");
        Ok(())
    }

    async fn schedule_publishing(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
        video: &VideoFile,
    ) -> Result<ScheduleOutcome, PlatformError> {
        self.upload_video(creds, container_id, video).await?;

        if facebook_supports_native_schedule(post.scheduled_date, Utc::now()) {
            self.finish_upload(creds, container_id, post, true).await?;
            tracing::info!(
                video_id = container_id,
                scheduled_date = %post.scheduled_date,
                "Facebook reel scheduled natively"
            );
            return Ok(ScheduleOutcome::NativelyScheduled);
        }

        // Too close to now for Facebook's scheduler; publish straight away.
        let result = self.publish_immediately(creds, container_id, post).await?;
        Ok(ScheduleOutcome::Published(result))
    }

    async fn publish_immediately(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
    ) -> Result<PublishResult, PlatformError> {
        self.finish_upload(creds, container_id, post, false).await?;
        tracing::info!(video_id = container_id, "Facebook reel published");

        // The video id is also the id of the published media object.
        Ok(PublishResult {
            success: true,
            media_id: container_id.to_string(),
            permalink: None,
        })
    }

    async fn fetch_permalink(
        &self,
        creds: &Credentials,
        media_id: &str,
    ) -> Result<String, PlatformError> {
        let body = self
            .client
            .get(
                media_id,
                &creds.access_token,
                &[("fields", "permalink_url".to_string())],
            )
            .await?;
        let permalink = require_id(&body, "permalink_url")?;
        Ok(absolute_permalink(&permalink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_permalinks_are_prefixed() {
        assert_eq!(
            absolute_permalink("/reel/1234567890/"),
            "https://www.facebook.com/reel/1234567890/"
        );
    }

    #[test]
    fn absolute_permalinks_are_kept() {
        let url = "https://www.facebook.com/reel/42";
        assert_eq!(absolute_permalink(url), url);
    }
}
