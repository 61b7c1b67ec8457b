//! The publish-completion step shared by the orchestrator and the arranger.

use cadence_core::social::SocialIdentity;
use cadence_core::types::DbId;
use cadence_db::models::client::Client;
use cadence_db::models::reel::Reel;
use cadence_db::repositories::ReelRepo;
use cadence_meta::webhook::facebook_reel_url;
use cadence_meta::{Credentials, PlatformError, PlatformStrategy, PublishResult};
use sqlx::PgPool;

use crate::error::PipelineError;

/// Build the strategy credentials for a client row.
pub fn credentials_for(client: &Client) -> Credentials {
    Credentials {
        account_id: client.account_id.clone(),
        access_token: client.access_token.clone(),
    }
}

/// Record a successful publish on the reel.
///
/// Resolves the public URL (from the result, else through the strategy)
/// and applies the guarded `SCHEDULED -> PUBLISHED` update. Returns `None`
/// when another path already completed the reel; that is not an error.
pub async fn complete_publication(
    pool: &PgPool,
    strategy: &dyn PlatformStrategy,
    client: &Client,
    reel_id: DbId,
    result: &PublishResult,
) -> Result<Option<Reel>, PipelineError> {
    if !result.success {
        return Err(PlatformError::Api {
            status: 200,
            message: format!("publish of media {} reported failure", result.media_id),
        }
        .into());
    }

    let video_url = match &result.permalink {
        Some(url) if !url.is_empty() => url.clone(),
        _ => resolve_permalink(strategy, client, &result.media_id).await,
    };

    let updated =
        ReelRepo::mark_published(pool, reel_id, Some(&result.media_id), &video_url).await?;
    match &updated {
        Some(reel) => tracing::info!(
            reel_id,
            media_id = %result.media_id,
            video_url = reel.video_url.as_deref().unwrap_or_default(),
            "Reel published"
        ),
        None => tracing::info!(reel_id, "Reel already completed elsewhere, publish not recorded"),
    }
    Ok(updated)
}

/// Ask the platform for the permalink. The media is already live at this
/// point, so a failed lookup degrades to a best-effort URL instead of
/// failing the reel.
async fn resolve_permalink(
    strategy: &dyn PlatformStrategy,
    client: &Client,
    media_id: &str,
) -> String {
    match strategy
        .fetch_permalink(&credentials_for(client), media_id)
        .await
    {
        Ok(url) if !url.is_empty() => url,
        Ok(_) => fallback_url(strategy.identity(), client, media_id),
        Err(e) => {
            tracing::warn!(media_id, error = %e, "Permalink lookup failed, using fallback URL");
            fallback_url(strategy.identity(), client, media_id)
        }
    }
}

fn fallback_url(identity: SocialIdentity, client: &Client, media_id: &str) -> String {
    match identity {
        SocialIdentity::Facebook => facebook_reel_url(media_id),
        SocialIdentity::Instagram => {
            format!("https://www.instagram.com/{}/", client.username.trim_start_matches('@'))
        }
    }
}
