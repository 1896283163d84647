//! HTTP client for the note service (JSON over HTTP with bearer auth).

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::wire::{
    AccessTokenResponse, ChangePasswordRequest, ErrorResponse, NoteListResponse, NoteResponse,
    NoteWriteRequest, RefreshRequest, RegisterRequest, TokenPairResponse, TokenRequest,
};
use super::{GatewayError, GatewayResult, NotePage, RemoteGateway};
use crate::auth::{validate_credentials, validate_new_password, AuthTokens, Registration, TokenStore};
use crate::config::GatewayConfig;
use crate::models::{NoteId, NoteRecord, User};

/// Remote gateway speaking the note service's REST API.
///
/// A request rejected with 401 triggers exactly one token refresh and one
/// retry of the original request.
#[derive(Clone)]
pub struct HttpGateway<S: TokenStore> {
    config: GatewayConfig,
    client: Client,
    tokens: S,
}

impl<S: TokenStore> HttpGateway<S> {
    pub fn new(config: GatewayConfig, tokens: S) -> GatewayResult<Self> {
        Ok(Self {
            config,
            client: Client::builder().build()?,
            tokens,
        })
    }

    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub const fn token_store(&self) -> &S {
        &self.tokens
    }

    /// Whether tokens are present locally (they may still be expired).
    pub fn is_logged_in(&self) -> GatewayResult<bool> {
        Ok(self.tokens.load_tokens()?.is_some())
    }

    pub async fn register(&self, registration: &Registration) -> GatewayResult<()> {
        registration.validate()?;

        let request = self
            .client
            .post(self.config.endpoint("api/auth/register/"))
            .json(&RegisterRequest {
                username: registration.username.trim(),
                password: &registration.password,
                first_name: registration.first_name.trim(),
                last_name: registration.last_name.trim(),
                email: registration.email.trim(),
            });
        ensure_success(request.send().await?).await?;
        tracing::info!("Registered account '{}'", registration.username.trim());
        Ok(())
    }

    /// Obtain a token pair and persist it.
    pub async fn login(&self, username: &str, password: &str) -> GatewayResult<AuthTokens> {
        validate_credentials(username, password)?;

        let request = self
            .client
            .post(self.config.endpoint("api/auth/token/"))
            .json(&TokenRequest {
                username: username.trim(),
                password,
            });
        let payload: TokenPairResponse = decode(ensure_success(request.send().await?).await?).await?;
        let tokens = AuthTokens {
            access: payload.access,
            refresh: payload.refresh,
        };
        self.tokens.save_tokens(&tokens)?;
        Ok(tokens)
    }

    /// Forget stored tokens. The service has no logout endpoint.
    pub fn logout(&self) -> GatewayResult<()> {
        self.tokens.clear_tokens()?;
        Ok(())
    }

    /// Exchange the stored refresh token for a new access token.
    pub async fn refresh_access_token(&self) -> GatewayResult<AuthTokens> {
        let current = self.tokens.load_tokens()?.ok_or(GatewayError::Unauthorized)?;
        self.refresh_from(&current).await
    }

    pub async fn user_info(&self) -> GatewayResult<User> {
        let endpoint = self.config.endpoint("api/auth/userinfo/");
        let response = self
            .send_authorized(|client| client.get(endpoint.as_str()))
            .await?;
        decode(response).await
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> GatewayResult<()> {
        validate_new_password(new_password, confirmation)?;

        let endpoint = self.config.endpoint("api/auth/change-password/");
        let body = ChangePasswordRequest {
            old_password,
            new_password,
        };
        self.send_authorized(|client| client.post(endpoint.as_str()).json(&body))
            .await?;
        Ok(())
    }

    async fn refresh_from(&self, current: &AuthTokens) -> GatewayResult<AuthTokens> {
        let request = self
            .client
            .post(self.config.endpoint("api/auth/token/refresh/"))
            .json(&RefreshRequest {
                refresh: &current.refresh,
            });

        let response = request.send().await?;
        let payload: AccessTokenResponse = match ensure_success(response).await {
            Ok(response) => decode(response).await?,
            Err(GatewayError::Server { status, message }) => {
                tracing::warn!("Token refresh rejected ({}): {}", status, message);
                return Err(GatewayError::Unauthorized);
            }
            Err(error) => return Err(error),
        };

        let refreshed = AuthTokens {
            access: payload.access,
            refresh: current.refresh.clone(),
        };
        self.tokens.save_tokens(&refreshed)?;
        tracing::debug!("Access token refreshed");
        Ok(refreshed)
    }

    /// Send with the stored access token, refreshing and retrying once on 401.
    async fn send_authorized<F>(&self, build: F) -> GatewayResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let tokens = self.tokens.load_tokens()?.ok_or(GatewayError::Unauthorized)?;

        let response = build(&self.client)
            .bearer_auth(&tokens.access)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        tracing::debug!("Access token rejected; refreshing before retry");
        let refreshed = self.refresh_from(&tokens).await?;
        let retried = build(&self.client)
            .bearer_auth(&refreshed.access)
            .send()
            .await?;
        ensure_success(retried).await
    }
}

impl<S: TokenStore> RemoteGateway for HttpGateway<S> {
    async fn list(&self, page: u32, query: Option<&str>) -> GatewayResult<NotePage> {
        let query = query.map(str::trim).filter(|query| !query.is_empty());
        let (endpoint, params) = match query {
            Some(title) => (
                self.config.endpoint("api/notes/filter"),
                vec![("title", title.to_string()), ("page", page.to_string())],
            ),
            None => (
                self.config.endpoint("api/notes/"),
                vec![("page", page.to_string())],
            ),
        };

        tracing::debug!("Fetching notes page {} (query: {:?})", page, query);
        let response = self
            .send_authorized(|client| client.get(endpoint.as_str()).query(&params))
            .await?;
        let payload: NoteListResponse = decode(response).await?;
        payload.into_page(self.config.base_url())
    }

    async fn create(&self, title: &str, body: &str) -> GatewayResult<NoteRecord> {
        let endpoint = self.config.endpoint("api/notes/");
        let request = NoteWriteRequest { title, body };
        let response = self
            .send_authorized(|client| client.post(endpoint.as_str()).json(&request))
            .await?;
        let payload: NoteResponse = decode(response).await?;
        NoteRecord::try_from(payload)
    }

    async fn update(&self, id: NoteId, title: &str, body: &str) -> GatewayResult<NoteRecord> {
        let endpoint = self.note_endpoint(id)?;
        let request = NoteWriteRequest { title, body };
        let response = self
            .send_authorized(|client| client.put(endpoint.as_str()).json(&request))
            .await?;
        let payload: NoteResponse = decode(response).await?;
        NoteRecord::try_from(payload)
    }

    async fn delete(&self, id: NoteId) -> GatewayResult<()> {
        let endpoint = self.note_endpoint(id)?;
        self.send_authorized(|client| client.delete(endpoint.as_str()))
            .await?;
        Ok(())
    }
}

impl<S: TokenStore> HttpGateway<S> {
    fn note_endpoint(&self, id: NoteId) -> GatewayResult<String> {
        if !id.is_remote() {
            return Err(GatewayError::Validation(format!(
                "note {id} has not been created on the server"
            )));
        }
        Ok(self.config.endpoint(&format!("api/notes/{id}/")))
    }
}

async fn ensure_success(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Server {
        status: status.as_u16(),
        message: parse_api_error(status, &body),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|error| GatewayError::Decode(error.to_string()))
}

const MAX_ERROR_BODY_CHARS: usize = 180;

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorResponse>(body) {
        if let Some(message) = payload.into_message() {
            return message.trim().to_string();
        }
    }

    // Raw bodies can be whole HTML error pages
    let trimmed = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect::<String>();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_error_prefers_detail() {
        let message = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Not found."}"#,
        );
        assert_eq!(message, "Not found.");
    }

    #[test]
    fn parse_api_error_falls_back_to_body_or_status() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"title": ["required"]}"#),
            r#"{"title": ["required"]}"#
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  "),
            "HTTP 502"
        );
    }

    #[test]
    fn parse_api_error_caps_raw_body() {
        let page = format!("<html>{}</html>", "x".repeat(500));
        let message = parse_api_error(StatusCode::BAD_GATEWAY, &page);
        assert_eq!(message.chars().count(), MAX_ERROR_BODY_CHARS);
        assert!(message.starts_with("<html>"));
    }

    #[test]
    fn note_endpoint_rejects_local_ids() {
        let gateway = HttpGateway::new(
            GatewayConfig::new("https://notes.example.com").unwrap(),
            crate::auth::MemoryTokenStore::default(),
        )
        .unwrap();

        assert_eq!(
            gateway.note_endpoint(NoteId::remote(7).unwrap()).unwrap(),
            "https://notes.example.com/api/notes/7/"
        );
        assert!(matches!(
            gateway.note_endpoint(NoteId::mint_local()),
            Err(GatewayError::Validation(_))
        ));
    }
}
