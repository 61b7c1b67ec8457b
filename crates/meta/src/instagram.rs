//! Instagram reels via the Instagram Graph API (content publishing).
//!
//! Flow: create a `REELS` container with `upload_type=resumable`, push the
//! bytes to the upload host, then call `media_publish` once the container
//! reports `FINISHED`. Instagram has no native delayed publish, so
//! [`PlatformStrategy::schedule_publishing`] only uploads and hands the final
//! step to the local arranger.

use async_trait::async_trait;
use cadence_core::social::SocialIdentity;
use serde_json::Value;

use crate::client::{require_id, GraphClient};
use crate::error::PlatformError;
use crate::strategy::{
    Credentials, PlatformStrategy, PublishResult, ReelPost, ScheduleOutcome, VideoFile,
};

/// Upload service segment on the resumable upload host.
const UPLOAD_SERVICE: &str = "ig-api-upload";

pub struct InstagramStrategy {
    client: GraphClient,
}

impl InstagramStrategy {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Fail unless the container has finished processing the upload.
    async fn ensure_container_ready(
        &self,
        creds: &Credentials,
        container_id: &str,
    ) -> Result<(), PlatformError> {
        let body = self
            .client
            .get(
                container_id,
                &creds.access_token,
                &[("fields", "status_code".to_string())],
            )
            .await?;
        container_readiness(container_id, &body)
    }
}

/// Interpret a container `status_code` response.
///
/// `FINISHED` (or a missing status, which older API versions return for
/// already-published containers) is ready. `IN_PROGRESS` is transient.
/// `ERROR` and `EXPIRED` are final.
pub fn container_readiness(container_id: &str, body: &Value) -> Result<(), PlatformError> {
    match body.get("status_code").and_then(Value::as_str) {
        None | Some("FINISHED") | Some("PUBLISHED") => Ok(()),
        Some(status @ "IN_PROGRESS") => Err(PlatformError::NotReady {
            container_id: container_id.to_string(),
            status: status.to_string(),
        }),
        Some(status) => Err(PlatformError::Api {
            status: 422,
            message: format!("container {container_id} is {status}"),
        }),
    }
}

#[async_trait]
impl PlatformStrategy for InstagramStrategy {
    fn identity(&self) -> SocialIdentity {
        SocialIdentity::Instagram
    }

    fn publishes_locally(&self) -> bool {
        true
    }

    async fn resolve_account_id(&self, access_token: &str) -> Result<String, PlatformError> {
        let body = self
            .client
            .get(
                "me/accounts",
                access_token,
                &[("fields", "instagram_business_account".to_string())],
            )
            .await?;

        body.get("data")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find_map(|page| page.get("instagram_business_account"))
            .ok_or(PlatformError::MissingField("instagram_business_account"))
            .and_then(|account| require_id(account, "id"))
    }

    async fn create_container(
        &self,
        creds: &Credentials,
        post: &ReelPost,
    ) -> Result<String, PlatformError> {
        let body = self
            .client
            .post(
                &format!("{}/media", creds.account_id),
                &creds.access_token,
                &[
                    ("media_type", "REELS".to_string()),
                    ("upload_type", "resumable".to_string()),
                    ("caption", post.caption()),
                ],
            )
            .await?;

        let container_id = require_id(&body, "id")?;
        tracing::info!(account_id = %creds.account_id, container_id = %container_id, "Instagram container created");
        Ok(container_id)
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
                message: format!("upload to container {container_id} was not accepted"),
            });
        }
        tracing::info!(container_id, bytes = video.len(), "Instagram video uploaded");
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
        Ok(ScheduleOutcome::Deferred {
            due: post.scheduled_date,
        })
    }

    async fn publish_immediately(
        &self,
        creds: &Credentials,
        container_id: &str,
        _post: &ReelPost,
    ) -> Result<PublishResult, PlatformError> {
        self.ensure_container_ready(creds, container_id).await?;

        let body = self
            .client
            .post(
                &format!("{}/media_publish", creds.account_id),
                &creds.access_token,
                &[("creation_id", container_id.to_string())],
            )
            .await?;

        let media_id = require_id(&body, "id")?;
        tracing::info!(container_id, media_id = %media_id, "Instagram reel published");
        Ok(PublishResult {
            success: true,
            media_id,
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
                &[("fields", "permalink".to_string())],
            )
            .await?;
        require_id(&body, "permalink")
    }
}
