//! In-memory storefront used by the workflow tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rigbuild_core::slots::{slot_for_label, Slot};
use rigbuild_core::{
    BuildCreate, BuildId, BuildTable, BuildTableRow, Cart, CartItem, CustomerId, ItemId, Product,
    ProductId,
};
use tokio::sync::Notify;

use crate::api::{AssemblyApi, CartApi};
use crate::{ApiError, Reply};

struct Line {
    item_id: ItemId,
    label: String,
    product: Product,
}

struct Build {
    customer: CustomerId,
    lines: Vec<Line>,
}

struct State {
    next_id: u32,
    builds: HashMap<BuildId, Build>,
    catalog: Vec<(String, Product)>,
    cart: Vec<CartItem>,
    assembly_fee: f64,
    complete_at: usize,
    fail_next: Vec<&'static str>,
    reject_next: HashMap<&'static str, String>,
    calls: Vec<&'static str>,
}

pub(crate) struct FakeShop {
    state: Mutex<State>,
    hold: Mutex<Option<Arc<Notify>>>,
}

pub(crate) fn product(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: ProductId::from(id),
        name: name.to_string(),
        price,
        discount_price: None,
        image_url: None,
        category: None,
        category_name: None,
        sub_category_name: None,
        tech_company_name: None,
        stock: Some(5),
        specifications: vec![],
    }
}

impl FakeShop {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 0,
                builds: HashMap::new(),
                catalog: vec![],
                cart: vec![],
                assembly_fee: 50.0,
                complete_at: 2,
                fail_next: vec![],
                reject_next: HashMap::new(),
                calls: vec![],
            }),
            hold: Mutex::new(None),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_build(&self, id: &str, customer: &str) -> BuildId {
        let id = BuildId::from(id);
        self.state().builds.insert(
            id.clone(),
            Build {
                customer: CustomerId::from(customer),
                lines: vec![],
            },
        );
        id
    }

    /// Put a line straight into a build, with any server label.
    pub fn seed_line(&self, build: &BuildId, label: &str, product: Product) -> ItemId {
        let mut st = self.state();
        st.next_id += 1;
        let item_id = ItemId::new(format!("item-{}", st.next_id));
        st.builds
            .get_mut(build)
            .expect("unknown build")
            .lines
            .push(Line {
                item_id: item_id.clone(),
                label: label.to_string(),
                product,
            });
        item_id
    }

    pub fn add_catalog(&self, category: &str, product: Product) {
        self.state().catalog.push((category.to_string(), product));
    }

    pub fn put_cart_item(&self, item: CartItem) {
        self.state().cart.push(item);
    }

    pub fn fail_next(&self, op: &'static str) {
        self.state().fail_next.push(op);
    }

    pub fn reject_next(&self, op: &'static str, message: &str) {
        self.state().reject_next.insert(op, message.to_string());
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.state().calls.iter().filter(|c| **c == op).count()
    }

    pub fn cart_len(&self) -> usize {
        self.state().cart.len()
    }

    pub fn line_count(&self, build: &BuildId) -> usize {
        self.state().builds.get(build).map_or(0, |b| b.lines.len())
    }

    pub fn customer_of(&self, build: &BuildId) -> Option<CustomerId> {
        self.state().builds.get(build).map(|b| b.customer.clone())
    }

    /// Make `build_table` wait until the returned handle is notified.
    pub fn hold_tables(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn release_tables(&self) {
        if let Some(n) = self.hold.lock().unwrap().take() {
            n.notify_one();
        }
    }

    /// Record the call and return an injected fault, if any.
    fn enter<T>(&self, op: &'static str) -> Option<Result<Reply<T>, ApiError>> {
        let mut st = self.state();
        st.calls.push(op);
        if let Some(pos) = st.fail_next.iter().position(|o| *o == op) {
            st.fail_next.remove(pos);
            return Some(Err(ApiError::Server {
                status: 503,
                message: "service unavailable".to_string(),
            }));
        }
        st.reject_next
            .remove(op)
            .map(|message| Ok(Reply::Rejected { message }))
    }

    fn table_of(st: &State, id: &BuildId, build: &Build) -> BuildTable {
        let mut rows: Vec<BuildTableRow> = build
            .lines
            .iter()
            .map(|l| {
                let price = l.product.price;
                BuildTableRow {
                    component_type: l.label.clone(),
                    component_display_name: l.label.clone(),
                    product_id: Some(l.product.id.clone()),
                    product_name: Some(l.product.name.clone()),
                    product_image_url: None,
                    sub_category_name: l.product.sub_category_name.clone(),
                    status: "Approved".to_string(),
                    price: Some(price),
                    discount: l
                        .product
                        .discount_price
                        .filter(|d| *d > 0.0)
                        .map(|d| price - d),
                    has_component: true,
                    item_id: Some(l.item_id.clone()),
                }
            })
            .collect();

        for slot in Slot::ALL {
            let filled = build
                .lines
                .iter()
                .any(|l| slot_for_label(&l.label) == Some(slot));
            if !filled {
                rows.push(BuildTableRow {
                    component_type: slot.as_str().to_string(),
                    component_display_name: slot.as_str().to_string(),
                    product_id: None,
                    product_name: None,
                    product_image_url: None,
                    sub_category_name: None,
                    status: "None".to_string(),
                    price: None,
                    discount: None,
                    has_component: false,
                    item_id: None,
                });
            }
        }

        let total_cost: f64 = build.lines.iter().map(|l| l.product.effective_price()).sum();
        BuildTable {
            assembly_id: id.clone(),
            components: rows,
            total_cost,
            assembly_fee: st.assembly_fee,
            grand_total: total_cost + st.assembly_fee,
            is_complete: build.lines.len() >= st.complete_at,
        }
    }
}

#[async_trait]
impl AssemblyApi for FakeShop {
    async fn create_build(&self, req: &BuildCreate) -> Result<Reply<BuildId>, ApiError> {
        if let Some(fault) = self.enter("create_build") {
            return fault;
        }
        let mut st = self.state();
        st.next_id += 1;
        let id = BuildId::new(format!("b-{}", st.next_id));
        st.builds.insert(
            id.clone(),
            Build {
                customer: req.customer_id.clone(),
                lines: vec![],
            },
        );
        Ok(Reply::ok(id))
    }

    async fn build_table(&self, build: &BuildId) -> Result<Reply<BuildTable>, ApiError> {
        if let Some(fault) = self.enter("build_table") {
            return fault;
        }
        let hold = self.hold.lock().unwrap().clone();
        if let Some(n) = hold {
            n.notified().await;
        }
        let st = self.state();
        Ok(match st.builds.get(build) {
            Some(b) => Reply::ok(Self::table_of(&st, build, b)),
            None => Reply::rejected("Build not found"),
        })
    }

    async fn compatible_products(
        &self,
        build: &BuildId,
        category: &str,
    ) -> Result<Reply<Vec<Product>>, ApiError> {
        if let Some(fault) = self.enter("compatible_products") {
            return fault;
        }
        let st = self.state();
        if !st.builds.contains_key(build) {
            return Ok(Reply::rejected("Build not found"));
        }
        Ok(Reply::ok(
            st.catalog
                .iter()
                .filter(|(c, _)| c == category)
                .map(|(_, p)| p.clone())
                .collect(),
        ))
    }

    async fn add_component(
        &self,
        build: &BuildId,
        product: &ProductId,
        category: &str,
    ) -> Result<Reply<()>, ApiError> {
        if let Some(fault) = self.enter("add_component") {
            return fault;
        }
        let mut st = self.state();
        let Some(found) = st
            .catalog
            .iter()
            .find(|(_, p)| &p.id == product)
            .map(|(_, p)| p.clone())
        else {
            return Ok(Reply::rejected("Product not found"));
        };
        st.next_id += 1;
        let item_id = ItemId::new(format!("item-{}", st.next_id));
        let Some(b) = st.builds.get_mut(build) else {
            return Ok(Reply::rejected("Build not found"));
        };
        let slot = slot_for_label(category);
        b.lines
            .retain(|l| slot.is_none() || slot_for_label(&l.label) != slot);
        b.lines.push(Line {
            item_id,
            label: category.to_string(),
            product: found,
        });
        Ok(Reply::Ok {
            message: "Component added".to_string(),
            data: (),
        })
    }

    async fn remove_component(&self, build: &BuildId, item: &ItemId) -> Result<Reply<()>, ApiError> {
        if let Some(fault) = self.enter("remove_component") {
            return fault;
        }
        let mut st = self.state();
        let Some(b) = st.builds.get_mut(build) else {
            return Ok(Reply::rejected("Build not found"));
        };
        let before = b.lines.len();
        b.lines.retain(|l| &l.item_id != item);
        if b.lines.len() == before {
            return Ok(Reply::rejected("Component not found in build"));
        }
        Ok(Reply::Ok {
            message: "Component removed".to_string(),
            data: (),
        })
    }

    async fn move_to_cart(&self, build: &BuildId) -> Result<Reply<()>, ApiError> {
        if let Some(fault) = self.enter("move_to_cart") {
            return fault;
        }
        let mut st = self.state();
        let table = match st.builds.get(build) {
            Some(b) if !b.lines.is_empty() => Self::table_of(&st, build, b),
            Some(_) => return Ok(Reply::rejected("Build has no components")),
            None => return Ok(Reply::rejected("Build not found")),
        };
        st.next_id += 1;
        let id = format!("cart-{}", st.next_id);
        st.cart.push(CartItem {
            id,
            product_id: ProductId::new(build.to_string()),
            product_name: "Custom PC build".to_string(),
            price: table.grand_total,
            quantity: 1,
            image_url: None,
            item_total: table.grand_total,
            is_custom_build: true,
            assembly_fee: Some(table.assembly_fee),
        });
        Ok(Reply::Ok {
            message: "Build moved to cart".to_string(),
            data: (),
        })
    }
}

#[async_trait]
impl CartApi for FakeShop {
    async fn cart(&self, customer: &CustomerId) -> Result<Reply<Cart>, ApiError> {
        if let Some(fault) = self.enter("cart") {
            return fault;
        }
        let st = self.state();
        Ok(Reply::ok(Cart {
            id: "cart".to_string(),
            customer_id: customer.clone(),
            created_at: None,
            cart_items: st.cart.clone(),
            sub_total: st.cart.iter().map(|i| i.item_total).sum(),
        }))
    }
}
