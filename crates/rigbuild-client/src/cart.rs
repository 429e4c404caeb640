use std::sync::Arc;

use rigbuild_core::session::Session;
use rigbuild_core::CartItem;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::CartApi;
use crate::Reply;

/// What the header cart icon shows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CartSummary {
    pub item_count: u32,
    pub total_price: f64,
}

impl CartSummary {
    pub fn from_items(items: &[CartItem]) -> Self {
        Self {
            item_count: items.iter().map(|i| i.quantity).sum(),
            total_price: items.iter().map(|i| i.price * f64::from(i.quantity)).sum(),
        }
    }
}

struct Inner {
    api: Arc<dyn CartApi>,
    session: Session,
    tx: watch::Sender<CartSummary>,
}

/// Latest cart summary, refreshed on demand and observable through
/// [`CartBadge::subscribe`].
#[derive(Clone)]
pub struct CartBadge {
    inner: Arc<Inner>,
}

impl CartBadge {
    pub fn new(api: Arc<dyn CartApi>, session: Session) -> Self {
        let (tx, _) = watch::channel(CartSummary::default());
        Self {
            inner: Arc::new(Inner { api, session, tx }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.inner.tx.subscribe()
    }

    pub fn current(&self) -> CartSummary {
        *self.inner.tx.borrow()
    }

    /// Re-read the cart for the signed-in customer. Without a customer the
    /// badge is left as is; any failure publishes an empty cart.
    pub async fn refresh(&self) -> CartSummary {
        let customer = match self.inner.session.customer_id() {
            Ok(Some(c)) => c,
            Ok(None) => {
                debug!("no customer in session, cart badge not refreshed");
                return self.current();
            }
            Err(e) => {
                warn!("cannot read session for cart refresh: {e}");
                return self.current();
            }
        };

        let summary = match self.inner.api.cart(&customer).await {
            Ok(Reply::Ok { data, .. }) => CartSummary::from_items(&data.cart_items),
            Ok(Reply::Rejected { message }) => {
                warn!(%customer, "cart lookup rejected: {message}");
                CartSummary::default()
            }
            Err(e) => {
                warn!(%customer, "failed to load cart: {e}");
                CartSummary::default()
            }
        };
        self.inner.tx.send_replace(summary);
        summary
    }
}
