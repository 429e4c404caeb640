//! Entry into the build flow: route to the selector when a build is cached,
//! otherwise create one.

use rigbuild_core::session::Session;
use rigbuild_core::{BuildCreate, BuildId};
use tracing::{error, info, warn};

use crate::{ApiError, Context, Reply};

/// Where the build flow should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Selector(BuildId),
    StartBuild,
}

pub fn entry(session: &Session) -> Result<Entry, ApiError> {
    Ok(match session.build_id()? {
        Some(id) => Entry::Selector(id),
        None => Entry::StartBuild,
    })
}

/// Optional details for a new build. The customer always comes from the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub service_usage_id: Option<String>,
}

/// Create a build for the signed-in customer and cache its id.
///
/// Returns the cached id without calling the server when one exists.
pub async fn start_build(ctx: &Context, draft: BuildDraft) -> Result<BuildId, ApiError> {
    if let Some(id) = ctx.session.build_id()? {
        info!(build = %id, "build already cached, reusing it");
        return Ok(id);
    }
    let Some(customer_id) = ctx.session.customer_id()? else {
        warn!("cannot start a build without a signed-in customer");
        ctx.notifier.error("Please sign in before starting a build.");
        return Err(ApiError::MissingPrecondition("customer id"));
    };

    let req = BuildCreate {
        customer_id,
        name: draft.name.filter(|s| !s.trim().is_empty()),
        description: draft.description.filter(|s| !s.trim().is_empty()),
        budget: draft.budget,
        service_usage_id: draft.service_usage_id.filter(|s| !s.trim().is_empty()),
    };

    match ctx.api.create_build(&req).await {
        Ok(Reply::Ok { data: id, .. }) => {
            ctx.session.set_build_id(id.clone())?;
            info!(build = %id, customer = %req.customer_id, "build created");
            ctx.notifier.success(format!("Build created! ID: {id}"));
            Ok(id)
        }
        Ok(Reply::Rejected { message }) => {
            warn!(customer = %req.customer_id, "build creation rejected: {message}");
            ctx.notifier.error(format!("Error: {message}"));
            Err(ApiError::Rejected { message })
        }
        Err(e) => {
            error!(customer = %req.customer_id, "build creation failed: {e}");
            ctx.notifier
                .error("Something went wrong while creating the build.");
            Err(e)
        }
    }
}
