//! Storefront API client and the PC-build workflow built on it.
//!
//! The server owns every piece of build state. The types here only ever
//! mirror it: each mutating call is followed by a fresh snapshot fetch
//! ([`selector::Selector::reconcile`]) and local slot state is rebuilt from
//! that snapshot.

pub mod api;
pub mod bootstrap;
pub mod cart;
pub mod http;
pub mod lifecycle;
pub mod notify;
mod parse;
pub mod picker;
pub mod selector;

#[cfg(test)]
mod fake;

use std::sync::Arc;

use rigbuild_core::session::Session;
use rigbuild_core::StoreError;

pub use api::{AssemblyApi, CartApi};
pub use cart::{CartBadge, CartSummary};
pub use http::HttpClient;
pub use lifecycle::Lifecycle;
pub use notify::{LogNotifier, Notice, Notifier, Recorder};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    /// The server answered `success: false`.
    #[error("{message}")]
    Rejected { message: String },

    #[error("invalid base URL {0:?}")]
    BaseUrl(String),

    #[error("missing {0}")]
    MissingPrecondition(&'static str),

    #[error("cancelled")]
    Cancelled,

    #[error("session: {0}")]
    Session(#[from] StoreError),
}

// ── Reply ───────────────────────────────────────────────────────────

/// Tagged form of the storefront's `{success, message, data}` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok { message: String, data: T },
    Rejected { message: String },
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Reply::Ok {
            message: String::new(),
            data,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Reply::Rejected {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Reply::Ok { message, .. } | Reply::Rejected { message } => message,
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Reply::Ok { data, .. } => Ok(data),
            Reply::Rejected { message } => Err(ApiError::Rejected { message }),
        }
    }
}

// ── Context ─────────────────────────────────────────────────────────

/// Everything a workflow step needs, handed in explicitly.
#[derive(Clone)]
pub struct Context {
    pub session: Session,
    pub api: Arc<dyn AssemblyApi>,
    pub notifier: Arc<dyn Notifier>,
    pub cart: CartBadge,
}

impl Context {
    pub fn new(
        session: Session,
        api: Arc<dyn AssemblyApi>,
        cart_api: Arc<dyn CartApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cart = CartBadge::new(cart_api, session.clone());
        Self {
            session,
            api,
            notifier,
            cart,
        }
    }

    /// Wire every seam to one [`HttpClient`].
    pub fn over_http(client: HttpClient, notifier: Arc<dyn Notifier>) -> Self {
        let session = client.session().clone();
        let client = Arc::new(client);
        Self::new(session, client.clone(), client, notifier)
    }
}
