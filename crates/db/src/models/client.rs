//! Client (managed social account) model and DTOs.

use cadence_core::error::CoreError;
use cadence_core::social::SocialIdentity;
use cadence_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `clients` table.
///
/// Holds the long-lived platform access token -- never serialize it. Use
/// [`ClientResponse`] for API output.
#[derive(Debug, Clone, FromRow)]
pub struct Client {
    pub id: DbId,
    /// `INSTAGRAM` or `FACEBOOK`; see [`Client::identity`].
    pub social_identity: String,
    pub name: String,
    pub username: String,
    pub description: Option<String>,
    pub access_token: String,
    /// Instagram business account id or Facebook page id.
    pub account_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    /// Parse the stored identity column.
    pub fn identity(&self) -> Result<SocialIdentity, CoreError> {
        self.social_identity.parse()
    }

    /// A client can only be scheduled against once both the token and the
    /// platform account id are present.
    pub fn has_credentials(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.account_id.trim().is_empty()
    }
}

/// Client representation for API responses (no access token).
#[derive(Debug, Clone, Serialize)]
pub struct ClientResponse {
    pub id: DbId,
    pub social_identity: String,
    pub name: String,
    pub username: String,
    pub description: Option<String>,
    pub account_id: String,
    pub has_token: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        let has_token = client.has_credentials();
        Self {
            id: client.id,
            social_identity: client.social_identity,
            name: client.name,
            username: client.username,
            description: client.description,
            account_id: client.account_id,
            has_token,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// DTO for inserting a client after its account id has been resolved.
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub social_identity: SocialIdentity,
    pub name: String,
    pub username: String,
    pub description: Option<String>,
    pub access_token: String,
    pub account_id: String,
}

/// DTO for updating display fields. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub username: Option<String>,
    pub description: Option<String>,
}

/// Filters for the paginated client listing.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    /// Substring matched against name, username and description.
    pub search: Option<String>,
    pub social_identity: Option<SocialIdentity>,
}
