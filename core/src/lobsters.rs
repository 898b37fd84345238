//! Read-only access to the Lobsters JSON API.
//!
//! The client is injected so callers decide how it is configured and shared;
//! `Lobsters::default_client` builds the usual one.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{ClientError, ValidationError};
use crate::http::RequestOptions;
use crate::normalize::OutputMode;

#[derive(Debug, Error)]
pub enum LobstersError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("lobsters returned HTTP {status}")]
    Http { status: u16 },
}

/// A story as returned by the listing and detail endpoints.
///
/// Field names match the camelCased envelope data; snake_case aliases cover
/// clients running in map mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(alias = "short_id")]
    pub short_id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default, alias = "comment_count")]
    pub comment_count: u64,
    /// A username string on current servers, an object on older ones.
    #[serde(default, alias = "submitter_user")]
    pub submitter_user: Value,
    #[serde(default, alias = "created_at")]
    pub created_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub struct Lobsters {
    client: Client,
}

impl Lobsters {
    pub const BASE_URL: &'static str = "https://lobste.rs";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Object-mode client pointed at `BASE_URL`.
    pub fn default_client() -> Client {
        Client::new(ClientConfig::new(Self::BASE_URL).with_output(OutputMode::Object))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch one page of the "active" listing. Pages start at 1.
    pub fn fetch_page_of_items(&self, page: u32) -> Result<Vec<Item>, LobstersError> {
        if page < 1 {
            return Err(ValidationError::InvalidPage.into());
        }
        self.fetch(&format!("/active/page/{page}.json"))
    }

    /// Fetch a single story by its short id. The id becomes a path segment,
    /// so anything beyond `[A-Za-z0-9_-]` is rejected before any I/O.
    pub fn fetch_item_by_id(&self, id: &str) -> Result<Item, LobstersError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ValidationError::InvalidId(id.to_string()).into());
        }
        self.fetch(&format!("/s/{id}.json"))
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T, LobstersError> {
        let envelope = self.client.get(endpoint, RequestOptions::new())?;
        if !envelope.is_success() {
            return Err(LobstersError::Http {
                status: envelope.status,
            });
        }
        Ok(envelope.data_as()?)
    }
}
