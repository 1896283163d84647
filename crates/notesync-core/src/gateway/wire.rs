//! Typed request and response bodies of the note service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GatewayError, GatewayResult, NotePage};
use crate::models::{NoteId, NoteRecord, SyncState};

#[derive(Debug, Serialize)]
pub(super) struct NoteWriteRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct NoteResponse {
    id: i64,
    title: String,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_name: String,
    creator_username: String,
}

impl TryFrom<NoteResponse> for NoteRecord {
    type Error = GatewayError;

    fn try_from(value: NoteResponse) -> GatewayResult<Self> {
        let id = NoteId::remote(value.id)
            .map_err(|_| GatewayError::Decode(format!("invalid note id {}", value.id)))?;
        Ok(Self {
            id,
            title: value.title,
            body: value.body,
            created_at: value.created_at.timestamp_millis(),
            updated_at: value.updated_at.timestamp_millis(),
            creator_name: value.creator_name,
            creator_username: value.creator_username,
            sync_state: SyncState::Synced,
            is_deleted: false,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NoteListResponse {
    count: u64,
    next: Option<String>,
    results: Vec<NoteResponse>,
}

impl NoteListResponse {
    /// Convert into a page, resolving relative `next` links against `base_url`.
    pub fn into_page(self, base_url: &str) -> GatewayResult<NotePage> {
        let next_page = parse_next_page(self.next.as_deref(), base_url)?;
        let records = self
            .results
            .into_iter()
            .map(NoteRecord::try_from)
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(NotePage {
            records,
            next_page,
            total: self.count,
        })
    }
}

/// Extract the `page` query parameter from a paginated `next` link.
pub(super) fn parse_next_page(next: Option<&str>, base_url: &str) -> GatewayResult<Option<u32>> {
    let Some(next) = next.map(str::trim).filter(|next| !next.is_empty()) else {
        return Ok(None);
    };

    let url = match Url::parse(next) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base_url)
            .and_then(|base| base.join(next))
            .map_err(|error| GatewayError::Decode(format!("invalid next link {next}: {error}")))?,
        Err(error) => {
            return Err(GatewayError::Decode(format!(
                "invalid next link {next}: {error}"
            )))
        }
    };

    let page = url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| GatewayError::Decode(format!("next link {next} has no page parameter")))?;

    page.parse::<u32>()
        .map(Some)
        .map_err(|_| GatewayError::Decode(format!("next link {next} has invalid page {page}")))
}

#[derive(Serialize)]
pub(super) struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

#[derive(Serialize)]
pub(super) struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(super) struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Serialize)]
pub(super) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Deserialize)]
pub(super) struct AccessTokenResponse {
    pub access: String,
}

#[derive(Serialize)]
pub(super) struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// Error bodies: DRF `detail`, or a generic `message`/`error`
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    detail: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.detail.or(self.message).or(self.error)
    }
}
