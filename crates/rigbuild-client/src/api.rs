//! Seams over the storefront endpoints the build workflow depends on.

use async_trait::async_trait;
use rigbuild_core::{BuildCreate, BuildId, BuildTable, Cart, CustomerId, ItemId, Product, ProductId};

use crate::{ApiError, Reply};

/// PC-assembly endpoints used by the selector, picker and bootstrap.
///
/// `Err` means the call never produced an envelope (transport, HTTP status,
/// undecodable body). A well-formed `success: false` is `Ok(Reply::Rejected)`.
#[async_trait]
pub trait AssemblyApi: Send + Sync {
    /// `POST /PCAssembly`
    async fn create_build(&self, req: &BuildCreate) -> Result<Reply<BuildId>, ApiError>;

    /// `GET /PCAssembly/build/{id}/table`
    async fn build_table(&self, build: &BuildId) -> Result<Reply<BuildTable>, ApiError>;

    /// `GET /PCAssembly/{id}/compatible-products/{category}`
    async fn compatible_products(
        &self,
        build: &BuildId,
        category: &str,
    ) -> Result<Reply<Vec<Product>>, ApiError>;

    /// `POST /PCAssembly/build/{id}/add-component`
    async fn add_component(
        &self,
        build: &BuildId,
        product: &ProductId,
        category: &str,
    ) -> Result<Reply<()>, ApiError>;

    /// `DELETE /PCAssembly/build/{id}/remove-component/{itemId}`
    async fn remove_component(&self, build: &BuildId, item: &ItemId) -> Result<Reply<()>, ApiError>;

    /// `POST /PCAssembly/{id}/move-to-cart`
    async fn move_to_cart(&self, build: &BuildId) -> Result<Reply<()>, ApiError>;
}

#[async_trait]
pub trait CartApi: Send + Sync {
    /// `GET /Cart/{customerId}`
    async fn cart(&self, customer: &CustomerId) -> Result<Reply<Cart>, ApiError>;
}
