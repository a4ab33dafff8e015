use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::backend::{BackendError, ContentSource, ReferenceSource, SubunitSource};
use crate::application::reference::ReferenceItem;
use crate::config::BackendSettings;
use crate::domain::content::ContentItem;
use crate::domain::entities::SubunitRecord;
use crate::infra::error::InfraError;

/// JSON-over-HTTP implementation of every backend source trait.
#[derive(Clone, Debug)]
pub struct RestBackend {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl RestBackend {
    pub fn new(base: Url, api_key: Option<String>) -> Result<Self, InfraError> {
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "backend URL `{base}` cannot be used as a base"
            )));
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self, InfraError> {
        let base = settings.base_url.clone().ok_or_else(|| {
            InfraError::configuration("backend.base_url is required (use --backend-url)")
        })?;
        Self::new(base, settings.api_key.clone())
    }

    pub fn user_agent() -> &'static str {
        concat!("portal-sync/", env!("CARGO_PKG_VERSION"))
    }

    /// Append percent-encoded `segments` to the base path.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::network(format!("invalid base URL `{}`", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "backend request");
        let request = self.client.request(method, url);
        match self.api_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::checked(request).await?;
        let bytes = response.bytes().await.map_err(BackendError::network)?;
        serde_json::from_slice(&bytes).map_err(BackendError::decode)
    }

    async fn send_unit(request: RequestBuilder) -> Result<(), BackendError> {
        Self::checked(request).await.map(drop)
    }

    async fn checked(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(BackendError::network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(BackendError::from_status(status.as_u16(), text.trim()))
    }
}

#[async_trait]
impl SubunitSource for RestBackend {
    async fn fetch(&self, subunit_id: &str) -> Result<SubunitRecord, BackendError> {
        let url = self.url(&["subunits", subunit_id])?;
        Self::send(self.request(Method::GET, url)).await
    }
}

#[async_trait]
impl<T: ContentItem> ContentSource<T> for RestBackend {
    async fn list(&self, subunit_id: &str) -> Result<Vec<T>, BackendError> {
        let url = self.url(&["subunits", subunit_id, T::KIND.as_str()])?;
        Self::send(self.request(Method::GET, url)).await
    }

    async fn create(&self, payload: &T::Create) -> Result<T, BackendError> {
        let url = self.url(&[T::KIND.as_str()])?;
        Self::send(self.request(Method::POST, url).json(payload)).await
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, BackendError> {
        let url = self.url(&[T::KIND.as_str(), id])?;
        Self::send(self.request(Method::PATCH, url).json(patch)).await
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        let url = self.url(&[T::KIND.as_str(), id])?;
        Self::send_unit(self.request(Method::DELETE, url)).await
    }
}

#[async_trait]
impl<R: ReferenceItem> ReferenceSource<R> for RestBackend {
    async fn list(&self) -> Result<Vec<R>, BackendError> {
        let url = self.url(&["reference", R::KIND.as_str()])?;
        Self::send(self.request(Method::GET, url)).await
    }
}
