use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use rigbuild_core::session::Session;
use rigbuild_core::{
    BuildCreate, BuildId, BuildRecord, BuildStatus, BuildTable, BuildTotal, Cart,
    CatalogComponent, ClientSettings, ComponentCategory, ComponentQuery, CustomerId, ItemId,
    Product, ProductId,
};
use tracing::{debug, error};

use crate::api::{AssemblyApi, CartApi};
use crate::parse;
use crate::{ApiError, Reply};

/// reqwest implementation of every storefront endpoint the client uses.
///
/// The bearer token is read from the session on each request, so a login
/// in another process is picked up without rebuilding the client.
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl HttpClient {
    pub fn new(settings: &ClientSettings, session: Session) -> Result<Self, ApiError> {
        let base_url = Url::parse(settings.base_url())
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| ApiError::BaseUrl(settings.base_url().to_string()))?;
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL plus `segments`, each percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach auth, send, and return the body of a 2xx response.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let builder = match self.session.token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let req = builder.build()?;
        let method = req.method().clone();
        let url = req.url().clone();
        debug!(%method, %url, "sending");

        let resp = self.http.execute(req).await.inspect_err(|e| {
            error!(%method, %url, "request failed: {e}");
        })?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = parse::error_message(&body);
            error!(%method, %url, status = status.as_u16(), "server error: {message}");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    // --- Build records ---

    /// `GET /PCAssembly/customer/{customerId}`
    pub async fn builds_for_customer(
        &self,
        customer: &CustomerId,
    ) -> Result<Reply<Vec<BuildRecord>>, ApiError> {
        let url = self.url(&["PCAssembly", "customer", customer.as_str()])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }

    // --- Catalog ---

    /// `GET /PCAssembly/build/components/{category}` with paging and sort.
    pub async fn components_by_category(
        &self,
        category: &str,
        query: &ComponentQuery,
    ) -> Result<Reply<Vec<CatalogComponent>>, ApiError> {
        let url = self.url(&["PCAssembly", "build", "components", category])?;
        let body = self
            .send(self.http.get(url).query(&query.to_pairs()))
            .await?;
        parse::envelope(&body)
    }

    /// `GET /PCAssembly/build/categories`
    pub async fn categories(&self) -> Result<Reply<Vec<ComponentCategory>>, ApiError> {
        let url = self.url(&["PCAssembly", "build", "categories"])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }

    // --- Build summaries ---

    /// `GET /PCAssembly/build/{id}/status`
    pub async fn build_status(&self, build: &BuildId) -> Result<Reply<BuildStatus>, ApiError> {
        let url = self.url(&["PCAssembly", "build", build.as_str(), "status"])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }

    /// `GET /PCAssembly/build/{id}/total`
    pub async fn build_total(&self, build: &BuildId) -> Result<Reply<BuildTotal>, ApiError> {
        let url = self.url(&["PCAssembly", "build", build.as_str(), "total"])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }
}

#[async_trait]
impl AssemblyApi for HttpClient {
    async fn create_build(&self, req: &BuildCreate) -> Result<Reply<BuildId>, ApiError> {
        let url = self.url(&["PCAssembly"])?;
        let body = self.send(self.http.post(url).json(req)).await?;
        parse::created_build(&body)
    }

    async fn build_table(&self, build: &BuildId) -> Result<Reply<BuildTable>, ApiError> {
        let url = self.url(&["PCAssembly", "build", build.as_str(), "table"])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }

    async fn compatible_products(
        &self,
        build: &BuildId,
        category: &str,
    ) -> Result<Reply<Vec<Product>>, ApiError> {
        let url = self.url(&["PCAssembly", build.as_str(), "compatible-products", category])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }

    async fn add_component(
        &self,
        build: &BuildId,
        product: &ProductId,
        category: &str,
    ) -> Result<Reply<()>, ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("productId", product.to_string())
            .text("category", category.to_string());
        let url = self.url(&["PCAssembly", "build", build.as_str(), "add-component"])?;
        let body = self.send(self.http.post(url).multipart(form)).await?;
        parse::ack(&body)
    }

    async fn remove_component(&self, build: &BuildId, item: &ItemId) -> Result<Reply<()>, ApiError> {
        let url = self.url(&[
            "PCAssembly",
            "build",
            build.as_str(),
            "remove-component",
            item.as_str(),
        ])?;
        let body = self.send(self.http.delete(url)).await?;
        parse::ack(&body)
    }

    async fn move_to_cart(&self, build: &BuildId) -> Result<Reply<()>, ApiError> {
        let url = self.url(&["PCAssembly", build.as_str(), "move-to-cart"])?;
        let body = self.send(self.http.post(url)).await?;
        parse::ack(&body)
    }
}

#[async_trait]
impl CartApi for HttpClient {
    async fn cart(&self, customer: &CustomerId) -> Result<Reply<Cart>, ApiError> {
        let url = self.url(&["Cart", customer.as_str()])?;
        let body = self.send(self.http.get(url)).await?;
        parse::envelope(&body)
    }
}
