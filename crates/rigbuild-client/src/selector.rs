//! The build selector: fixed slots mirroring the server's build table.
//!
//! Every mutation goes to the server first and is followed by
//! [`Selector::reconcile`], which fetches the authoritative table and
//! rebuilds the [`SlotBoard`] from scratch. Nothing on the board is ever
//! filled from local knowledge alone.

use rigbuild_core::slots::{Slot, SlotBoard, SlotState};
use rigbuild_core::{BuildId, BuildTable, ItemId, Product, Totals};
use tracing::{debug, error, info, warn};

use crate::picker::{Picked, Picker};
use crate::{ApiError, CartSummary, Context, Lifecycle, Reply};

/// What the last successful reconcile found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub selected: usize,
    /// Category labels of populated rows not shown in any slot.
    pub dropped: Vec<String>,
    /// Slot of the pending pick, when the server confirmed it.
    pub confirmed: Option<Slot>,
    /// Slot of the pending pick, when the server did not have it.
    pub discarded: Option<Slot>,
}

/// One row of the selector as rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView<'a> {
    pub slot: Slot,
    pub state: &'a SlotState,
    /// Product just picked for this slot and not yet confirmed by a reconcile.
    pub pending: Option<&'a Product>,
}

impl SlotView<'_> {
    pub fn is_filled(&self) -> bool {
        self.state.is_selected()
    }
}

pub struct Selector {
    ctx: Context,
    build_id: Option<BuildId>,
    board: SlotBoard,
    table: Option<BuildTable>,
    pending: Option<Picked>,
    loading: bool,
    lifecycle: Lifecycle,
}

impl Selector {
    /// Open the selector for the cached build. `picked` is the hand-off from
    /// the picker, if the user just came from there.
    ///
    /// A failed initial load is reported through the notifier and leaves an
    /// empty board; only session storage errors are returned.
    pub async fn open(ctx: Context, picked: Option<Picked>) -> Result<Self, ApiError> {
        let build_id = ctx.session.build_id()?;
        let mut selector = Self {
            ctx,
            build_id,
            board: SlotBoard::empty(),
            table: None,
            pending: picked,
            loading: false,
            lifecycle: Lifecycle::new(),
        };
        if selector.build_id.is_some() {
            if let Err(e) = selector.reconcile().await {
                debug!("initial build load failed: {e}");
            }
        } else {
            debug!("no cached build, showing empty selector");
        }
        Ok(selector)
    }

    pub fn build_id(&self) -> Option<&BuildId> {
        self.build_id.as_ref()
    }

    pub fn board(&self) -> &SlotBoard {
        &self.board
    }

    /// Totals of the last snapshot; `None` until one has loaded.
    pub fn totals(&self) -> Option<Totals> {
        self.table.as_ref().map(BuildTable::totals)
    }

    pub fn is_complete(&self) -> bool {
        self.table.as_ref().is_some_and(|t| t.is_complete)
    }

    pub fn table(&self) -> Option<&BuildTable> {
        self.table.as_ref()
    }

    pub fn pending(&self) -> Option<&Picked> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn slot_views(&self) -> impl Iterator<Item = SlotView<'_>> {
        self.board.iter().map(|(slot, state)| SlotView {
            slot,
            state,
            pending: self
                .pending
                .as_ref()
                .filter(|p| p.slot == slot)
                .map(|p| &p.product),
        })
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Cancel in-flight requests. Their results are never applied.
    pub fn close(&self) {
        self.lifecycle.cancel();
    }

    /// Re-fetch the build table and rebuild every slot from it.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome, ApiError> {
        self.refresh(true).await
    }

    async fn refresh(&mut self, announce: bool) -> Result<ReconcileOutcome, ApiError> {
        self.build_id = self.ctx.session.build_id()?;
        let Some(build) = self.build_id.clone() else {
            self.board = SlotBoard::empty();
            self.table = None;
            self.pending = None;
            return Ok(ReconcileOutcome::default());
        };

        self.loading = true;
        let res = self.lifecycle.guard(self.ctx.api.build_table(&build)).await;
        self.loading = false;

        match res {
            Ok(Reply::Ok { data, .. }) => Ok(self.apply(data)),
            Ok(Reply::Rejected { message }) => {
                warn!(%build, "build table rejected: {message}");
                if announce {
                    self.ctx.notifier.error(format!("Failed to load build: {message}"));
                }
                Err(ApiError::Rejected { message })
            }
            Err(ApiError::Cancelled) => {
                debug!(%build, "selector closed, discarding build table");
                Err(ApiError::Cancelled)
            }
            Err(e) => {
                error!(%build, "error loading build: {e}");
                if announce {
                    self.ctx.notifier.error("Something went wrong while loading the build.");
                }
                Err(e)
            }
        }
    }

    fn apply(&mut self, table: BuildTable) -> ReconcileOutcome {
        let board = SlotBoard::from_table(&table);
        let mut outcome = ReconcileOutcome {
            selected: board.selected_count(),
            dropped: board.dropped().iter().map(|d| d.label.clone()).collect(),
            ..Default::default()
        };

        if let Some(picked) = self.pending.take() {
            let confirmed = board
                .get(picked.slot)
                .line_item()
                .is_some_and(|item| item.product.id == picked.product.id);
            if confirmed {
                outcome.confirmed = Some(picked.slot);
            } else {
                warn!(
                    slot = %picked.slot,
                    product = %picked.product.id,
                    "picked product not in build, dropping highlight"
                );
                outcome.discarded = Some(picked.slot);
            }
        }

        info!(
            build = %table.assembly_id,
            selected = outcome.selected,
            dropped = outcome.dropped.len(),
            grand_total = table.grand_total,
            "build reconciled"
        );
        self.board = board;
        self.table = Some(table);
        outcome
    }

    /// Open the picker for a slot. Leaves the selector untouched.
    pub async fn navigate_to(&self, slot: Slot) -> Result<Picker, ApiError> {
        debug!(slot = %slot, "choosing component");
        Picker::open(self.ctx.clone(), slot).await
    }

    /// Remove whatever the slot holds.
    pub async fn remove(&mut self, slot: Slot) -> Result<(), ApiError> {
        let item_id = self
            .board
            .get(slot)
            .line_item()
            .and_then(|item| item.item_id.clone());
        match item_id {
            Some(id) => self.remove_item(&id).await,
            None => {
                warn!(slot = %slot, "no item id to remove");
                self.ctx.notifier.error("Nothing to remove in this slot.");
                Err(ApiError::MissingPrecondition("item id"))
            }
        }
    }

    pub async fn remove_item(&mut self, item_id: &ItemId) -> Result<(), ApiError> {
        let Some(build) = self.build_id.clone() else {
            warn!(item = %item_id, "no cached build, cannot remove component");
            self.ctx.notifier.error("No PC build found. Please start a new build.");
            return Err(ApiError::MissingPrecondition("build id"));
        };

        let res = self
            .lifecycle
            .guard(self.ctx.api.remove_component(&build, item_id))
            .await;
        match res {
            Ok(Reply::Ok { .. }) => {
                info!(%build, item = %item_id, "component removed");
                if let Some(slot) = self.board.slot_of_item(item_id) {
                    self.board.clear(slot);
                }
                // the removal stands even if the follow-up load fails
                if let Err(e) = self.reconcile().await {
                    debug!(%build, "reload after removal failed: {e}");
                }
                Ok(())
            }
            Ok(Reply::Rejected { message }) => {
                warn!(%build, item = %item_id, "remove component rejected: {message}");
                self.ctx
                    .notifier
                    .error(format!("Failed to remove component: {message}"));
                Err(ApiError::Rejected { message })
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => {
                error!(%build, item = %item_id, "error removing component: {e}");
                self.ctx
                    .notifier
                    .error("Something went wrong while removing the component.");
                Err(e)
            }
        }
    }

    /// Convert the build into a cart entry. Issued once per call; a failure
    /// leaves the build intact for the user to try again.
    pub async fn add_to_cart(&mut self) -> Result<CartSummary, ApiError> {
        let (Some(build), Some(_)) = (self.build_id.clone(), self.table.as_ref()) else {
            error!("missing build information, cannot add to cart");
            self.ctx
                .notifier
                .error("Missing build information. Cannot add to cart.");
            return Err(ApiError::MissingPrecondition("build totals"));
        };
        if self.ctx.session.customer_id()?.is_none() {
            error!(%build, "no customer id, cannot add to cart");
            self.ctx
                .notifier
                .error("No customer ID found. Cannot add to cart.");
            return Err(ApiError::MissingPrecondition("customer id"));
        }

        let res = self
            .lifecycle
            .guard(self.ctx.api.move_to_cart(&build))
            .await;
        match res {
            Ok(Reply::Ok { .. }) => {
                info!(%build, "build added to cart");
                let summary = self.ctx.cart.refresh().await;
                self.ctx.notifier.success("Build added to cart successfully!");
                if let Err(e) = self.refresh(false).await {
                    debug!(%build, "reload after cart hand-off failed: {e}");
                }
                Ok(summary)
            }
            Ok(Reply::Rejected { message }) => {
                warn!(%build, "failed to add build to cart: {message}");
                self.ctx
                    .notifier
                    .error(format!("Failed to add build to cart: {message}"));
                Err(ApiError::Rejected { message })
            }
            Err(ApiError::Cancelled) => Err(ApiError::Cancelled),
            Err(e) => {
                error!(%build, "error while adding build to cart: {e}");
                self.ctx
                    .notifier
                    .error("Something went wrong while adding to cart.");
                Err(e)
            }
        }
    }
}
