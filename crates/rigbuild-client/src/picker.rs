use rigbuild_core::slots::Slot;
use rigbuild_core::{BuildId, Product, ProductId};
use tracing::{debug, error, info, warn};

use crate::{ApiError, Context, Lifecycle, Reply};

/// Hand-off back to the selector after a successful add: the chosen product
/// and the slot it went into, shown as pending until the next reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct Picked {
    pub slot: Slot,
    pub product: Product,
}

/// Compatible-product list for one slot of the cached build.
pub struct Picker {
    ctx: Context,
    slot: Slot,
    build_id: Option<BuildId>,
    products: Vec<Product>,
    error: Option<String>,
    loading: bool,
    adding: bool,
    lifecycle: Lifecycle,
}

impl Picker {
    /// Open the picker and load the list. A missing build leaves the list
    /// empty; the error shows up when the user tries to pick.
    pub async fn open(ctx: Context, slot: Slot) -> Result<Self, ApiError> {
        let build_id = ctx.session.build_id()?;
        let mut picker = Self {
            ctx,
            slot,
            build_id,
            products: vec![],
            error: None,
            loading: false,
            adding: false,
            lifecycle: Lifecycle::new(),
        };
        if picker.build_id.is_some() {
            picker.load().await;
        } else {
            debug!(slot = %slot, "no cached build, nothing to list");
        }
        Ok(picker)
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Inline error shown above the list.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Cancel anything still in flight. Late results are dropped.
    pub fn close(&self) {
        self.lifecycle.cancel();
    }

    /// (Re)load compatible products. On failure the previous list stays.
    pub async fn load(&mut self) {
        let Some(build) = self.build_id.clone() else {
            return;
        };
        let category = self.slot.as_str();
        self.loading = true;
        self.error = None;

        let res = self
            .lifecycle
            .guard(self.ctx.api.compatible_products(&build, category))
            .await;
        self.loading = false;

        match res {
            Ok(Reply::Ok { data, .. }) if data.is_empty() => {
                info!(%build, category, "no compatible products");
                self.products.clear();
                self.error = Some("No compatible products".to_string());
            }
            Ok(Reply::Ok { data, .. }) => {
                debug!(%build, category, count = data.len(), "compatible products loaded");
                self.products = data;
            }
            Ok(Reply::Rejected { message }) => {
                warn!(%build, category, "compatible products rejected: {message}");
                self.error = Some(non_empty(message, "Failed to load products"));
            }
            Err(ApiError::Cancelled) => {
                debug!(%build, category, "picker closed, discarding product list");
            }
            Err(e) => {
                error!(%build, category, "failed to load compatible products: {e}");
                self.error = Some("Failed to load products. Please try again later.".to_string());
            }
        }
    }

    /// Add a listed product to the build.
    pub async fn select(&mut self, product_id: &ProductId) -> Result<Picked, ApiError> {
        let Some(build) = self.build_id.clone() else {
            self.error = Some("No PC build found. Please start a new build.".to_string());
            return Err(ApiError::MissingPrecondition("build id"));
        };
        let Some(product) = self.products.iter().find(|p| &p.id == product_id).cloned() else {
            warn!(%build, product = %product_id, "product is not in the compatible list");
            self.error = Some("Please choose a product from the list.".to_string());
            return Err(ApiError::MissingPrecondition("selected product"));
        };

        let category = self.slot.as_str();
        self.adding = true;
        self.error = None;
        let res = self
            .lifecycle
            .guard(self.ctx.api.add_component(&build, &product.id, category))
            .await;
        self.adding = false;

        match res {
            Ok(Reply::Ok { .. }) => {
                info!(%build, category, product = %product.id, "component added");
                Ok(Picked {
                    slot: self.slot,
                    product,
                })
            }
            Ok(Reply::Rejected { message }) => {
                warn!(%build, category, product = %product.id, "add component rejected: {message}");
                let shown = non_empty(message.clone(), "Failed to add product to build.");
                self.error = Some(shown);
                Err(ApiError::Rejected { message })
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => {
                error!(%build, category, product = %product.id, "failed to add component: {e}");
                self.error = Some("Something went wrong. Please try again.".to_string());
                Err(e)
            }
        }
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}
