//! HTTP client for the Corral service API.

use corral_core::credential::Credential;
use corral_core::glidein::{CreateGlidein, Glidein};
use corral_core::history::{GlideinHistoryEntry, SiteHistoryEntry};
use corral_core::site::{CreateSite, Site};
use corral_core::types::DbId;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

const SUBJECT_HEADER: &str = "X-Client-Subject";

/// Errors from talking to the service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (connection refused, DNS, etc.).
    #[error("Error communicating with service: {0}")]
    Request(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct Created {
    id: DbId,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Which owners' resources to list.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,
}

pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
    subject: Option<String>,
}

impl ServiceClient {
    /// * `base_url` - e.g. `http://localhost:8443`.
    /// * `subject` - certificate DN sent with every request.
    pub fn new(base_url: impl Into<String>, subject: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            subject,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    fn with_subject(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.subject {
            Some(subject) => request.header(SUBJECT_HEADER, subject),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = self.with_subject(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("Service returned {status}: {text}"));
        Err(ClientError::Api { status, message })
    }

    async fn data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let body: Data<T> = self.send(request).await?.json().await?;
        Ok(body.data)
    }

    // -----------------------------------------------------------------------
    // Sites
    // -----------------------------------------------------------------------

    pub async fn create_site(&self, site: &CreateSite) -> Result<DbId, ClientError> {
        let created: Created = self.data(self.http.post(self.url("/sites")).json(site)).await?;
        Ok(created.id)
    }

    pub async fn list_sites(&self, query: &ListQuery) -> Result<Vec<Site>, ClientError> {
        self.data(self.http.get(self.url("/sites")).query(query)).await
    }

    pub async fn get_site(&self, id: DbId) -> Result<Site, ClientError> {
        self.data(self.http.get(self.url(&format!("/sites/{id}")))).await
    }

    pub async fn site_history(&self, id: DbId) -> Result<Vec<SiteHistoryEntry>, ClientError> {
        self.data(self.http.get(self.url(&format!("/sites/{id}/history")))).await
    }

    pub async fn submit_site(&self, id: DbId, credential: &Credential) -> Result<(), ClientError> {
        let url = self.url(&format!("/sites/{id}/submit"));
        self.send(self.http.post(url).json(&json!({ "credential": credential })))
            .await?;
        Ok(())
    }

    pub async fn remove_site(
        &self,
        id: DbId,
        force: bool,
        credential: Option<&Credential>,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/sites/{id}/remove"));
        let body = json!({ "force": force, "credential": credential });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Glideins
    // -----------------------------------------------------------------------

    pub async fn create_glidein(&self, glidein: &CreateGlidein) -> Result<DbId, ClientError> {
        let created: Created = self
            .data(self.http.post(self.url("/glideins")).json(glidein))
            .await?;
        Ok(created.id)
    }

    pub async fn list_glideins(&self, query: &ListQuery) -> Result<Vec<Glidein>, ClientError> {
        self.data(self.http.get(self.url("/glideins")).query(query)).await
    }

    pub async fn get_glidein(&self, id: DbId) -> Result<Glidein, ClientError> {
        self.data(self.http.get(self.url(&format!("/glideins/{id}")))).await
    }

    pub async fn glidein_history(
        &self,
        id: DbId,
    ) -> Result<Vec<GlideinHistoryEntry>, ClientError> {
        self.data(self.http.get(self.url(&format!("/glideins/{id}/history"))))
            .await
    }

    pub async fn submit_glidein(&self, id: DbId, credential: &Credential) -> Result<(), ClientError> {
        let url = self.url(&format!("/glideins/{id}/submit"));
        self.send(self.http.post(url).json(&json!({ "credential": credential })))
            .await?;
        Ok(())
    }

    pub async fn remove_glidein(&self, id: DbId, force: bool) -> Result<(), ClientError> {
        let url = self.url(&format!("/glideins/{id}/remove"));
        self.send(self.http.post(url).json(&json!({ "force": force })))
            .await?;
        Ok(())
    }
}
