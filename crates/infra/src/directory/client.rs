//! HTTP implementation of the `DirectoryClient` port

use async_trait::async_trait;
use dirmirror_core::directory::{DirectoryClient, FetchProgress};
use dirmirror_domain::{
    MirrorError, PasswordReset, ProfileUpdate, RemoteConfig, RemoteRecord, Result,
};
use reqwest::{Method, StatusCode};
use serde_json::json;
use tracing::{debug, info, instrument};
use url::Url;

use super::pagination::{decode_records, PaginatedFetcher};
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Directory API client for the `/users` resource.
pub struct DirectoryApiClient {
    base_url: Url,
    http: HttpClient,
    fetcher: PaginatedFetcher,
}

impl DirectoryApiClient {
    /// Build a client from the remote section of the configuration.
    ///
    /// # Errors
    /// Returns `MirrorError::Config` for an unparsable base URL or a token
    /// that cannot be sent as a header.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let http = HttpClient::for_remote(config)?;
        Self::new(&config.base_url, http)
    }

    pub fn new(base_url: &str, http: HttpClient) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| MirrorError::Config(format!("invalid API base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(MirrorError::Config(format!("API base URL '{base_url}' cannot be a base")));
        }
        // `Url::join` drops the last segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let fetcher = PaginatedFetcher::new(http.clone());
        Ok(Self { base_url, http, fetcher })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| MirrorError::Internal(format!("cannot build URL for '{path}': {e}")))
    }

    /// `users/{id}` followed by `tail`, with every piece percent-encoded as
    /// a single path segment.
    fn user_url(&self, id: &str, tail: &[&str]) -> Result<Url> {
        if matches!(id, "" | "." | "..") {
            return Err(MirrorError::Validation(format!("'{id}' is not a user id")));
        }
        let mut url = self.endpoint("users")?;
        url.path_segments_mut()
            .map_err(|()| MirrorError::Internal(format!("cannot extend URL '{}'", self.base_url)))?
            .push(id)
            .extend(tail);
        Ok(url)
    }
}

#[async_trait]
impl DirectoryClient for DirectoryApiClient {
    #[instrument(skip(self, progress))]
    async fn list_users(&self, progress: Option<&dyn FetchProgress>) -> Result<Vec<RemoteRecord>> {
        let records = self.fetcher.fetch_all(self.endpoint("users")?, &[], progress).await?;
        info!(records = records.len(), "user collection fetched");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &str) -> Result<Option<RemoteRecord>> {
        let request = self.http.request(Method::GET, self.user_url(id, &[])?);
        let response = self.http.send(request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(user_id = id, "user not found in directory");
            return Ok(None);
        }
        let response = ensure_success(response)?;

        Ok(decode_records(response).await?.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<RemoteRecord>> {
        let filter = format!("profile.email eq \"{email}\"");
        let page = self.fetcher.fetch_page(self.endpoint("users")?, &[("filter", filter.as_str())]).await?;
        Ok(page.records.into_iter().next())
    }

    #[instrument(skip(self, update), fields(fields = update.len()))]
    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<RemoteRecord> {
        let body = json!({ "profile": update.to_json() });
        let request = self.http.request(Method::POST, self.user_url(id, &[])?).json(&body);
        let response = self.http.send_expecting_success(request).await?;

        decode_records(response).await?.into_iter().next().ok_or_else(|| {
            MirrorError::RemoteUnavailable("profile update returned no user record".into())
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: &str) -> Result<()> {
        let request = self.http.request(Method::DELETE, self.user_url(id, &[])?);
        self.http.send_expecting_success(request).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn reset_password(&self, id: &str) -> Result<PasswordReset> {
        let url = self.user_url(id, &["lifecycle", "reset_password"])?;
        let request = self.http.request(Method::POST, url).query(&[("sendEmail", "true")]);
        let response = self.http.send_expecting_success(request).await?;

        let body = response.bytes().await.map_err(|e| MirrorError::from(InfraError::from(e)))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(PasswordReset::default());
        }
        serde_json::from_slice(&body).map_err(|e| MirrorError::from(InfraError::from(e)))
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    response.error_for_status().map_err(|e| MirrorError::from(InfraError::from(e)))
}

#[cfg(test)]
mod tests {
    use dirmirror_domain::ProfileField;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn client(server: &MockServer) -> DirectoryApiClient {
        let config = RemoteConfig {
            base_url: format!("{}/api/v1", server.uri()),
            api_token: "t0ken".into(),
            ..RemoteConfig::default()
        };
        DirectoryApiClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn list_uses_default_credential_scheme() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .and(header("authorization", "SSWS t0ken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "u1"}])))
            .expect(1)
            .mount(&server)
            .await;

        let records = client(&server).await.list_users(None).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn get_user_maps_404_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errorCode": "E0000007"})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).await.get_user("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_user_other_errors_are_remote_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/u1"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server).await.get_user("u1").await.unwrap_err();
        assert!(matches!(err, MirrorError::RemoteUnavailable(msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn find_by_email_sends_filter_and_takes_first_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .and(query_param("filter", "profile.email eq \"ada@example.com\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": "u1"}, {"id": "u2"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let found = client(&server).await.find_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.unwrap().id(), Some("u1"));
    }

    #[tokio::test]
    async fn find_by_email_without_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(client(&server).await.find_user_by_email("x@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_posts_profile_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/u1"))
            .and(body_json(json!({"profile": {"firstName": "Grace"}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "u1", "profile": {"firstName": "Grace"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let update = ProfileUpdate::new().with_text(ProfileField::FirstName, "Grace");
        let record = client(&server).await.update_profile("u1", &update).await.unwrap();
        assert_eq!(record.into_user().unwrap().profile.first_name.as_deref(), Some("Grace"));
    }

    #[tokio::test]
    async fn delete_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/users/u1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.delete_user("u1").await.unwrap();
    }

    #[tokio::test]
    async fn reset_password_requests_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/u1/lifecycle/reset_password"))
            .and(query_param("sendEmail", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Reset password with email",
                "resetPasswordUrl": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reset = client(&server).await.reset_password("u1").await.unwrap();
        assert_eq!(reset.summary.as_deref(), Some("Reset password with email"));
        assert!(reset.reset_password_url.is_none());
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let result = DirectoryApiClient::new("not a url", HttpClient::new().unwrap());
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[test]
    fn user_ids_stay_inside_one_path_segment() {
        let client =
            DirectoryApiClient::new("https://example.okta.com/api/v1", HttpClient::new().unwrap())
                .unwrap();

        let url = client.user_url("a?b#c/d", &[]).unwrap();
        assert_eq!(url.path(), "/api/v1/users/a%3Fb%23c%2Fd");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client.user_url("u1", &["lifecycle", "reset_password"]).unwrap();
        assert_eq!(url.path(), "/api/v1/users/u1/lifecycle/reset_password");

        assert!(matches!(client.user_url("..", &[]), Err(MirrorError::Validation(_))));
    }
}
