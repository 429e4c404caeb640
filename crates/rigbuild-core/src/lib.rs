pub mod session;
pub mod slots;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// --- Identifiers ---

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Server-side identifier of a PC build (the `pcAssemblyId`).
    BuildId
);
id_type!(CustomerId);
id_type!(ProductId);
id_type!(
    /// Identifier of one line item inside a build.
    ItemId
);

// --- Types (mirroring the storefront API) ---

/// Envelope every storefront endpoint wraps its payload in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    pub key: String,
    pub value: String,
}

/// Catalog product as returned by the compatible-products query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub sub_category_name: Option<String>,
    #[serde(default)]
    pub tech_company_name: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub specifications: Vec<Specification>,
}

impl Product {
    /// Price the customer pays: the discount price when the catalog carries a positive one.
    pub fn effective_price(&self) -> f64 {
        match self.discount_price {
            Some(d) if d > 0.0 => d,
            _ => self.price,
        }
    }
}

/// One row of the build table. Rows exist for every category the server
/// tracks; `product_id` is only set when the row holds a component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildTableRow {
    pub component_type: String,
    #[serde(default)]
    pub component_display_name: String,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub sub_category_name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub has_component: bool,
    #[serde(default)]
    pub item_id: Option<ItemId>,
}

/// Authoritative build snapshot (`GET /PCAssembly/build/{id}/table`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildTable {
    pub assembly_id: BuildId,
    #[serde(default)]
    pub components: Vec<BuildTableRow>,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub assembly_fee: f64,
    #[serde(default)]
    pub grand_total: f64,
    #[serde(default)]
    pub is_complete: bool,
}

impl BuildTable {
    /// Line items for every populated row, in server order.
    pub fn line_items(&self) -> impl Iterator<Item = LineItem> + '_ {
        self.components.iter().filter_map(LineItem::from_row)
    }

    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.total_cost,
            assembly_fee: self.assembly_fee,
            grand_total: self.grand_total,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: f64,
    pub assembly_fee: f64,
    pub grand_total: f64,
}

/// Product as seen from a build line: immutable from the client's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Missing when the server returns a populated row without an item id;
    /// such a line cannot be removed.
    pub item_id: Option<ItemId>,
    pub product: ProductRef,
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub status: String,
}

impl LineItem {
    pub fn from_row(row: &BuildTableRow) -> Option<Self> {
        let product_id = row.product_id.clone().filter(|id| !id.as_str().is_empty())?;
        let price = row.price.unwrap_or(0.0);
        let unit_price = match row.discount {
            Some(d) if d > 0.0 => price - d,
            _ => price,
        };
        Some(Self {
            item_id: row.item_id.clone(),
            product: ProductRef {
                id: product_id,
                name: row.product_name.clone().unwrap_or_default(),
                price,
                discount: row.discount,
                category: row.component_type.clone(),
                sub_category: row.sub_category_name.clone(),
                image_url: row.product_image_url.clone(),
            },
            unit_price,
            quantity: 1,
            status: row.status.clone(),
        })
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildCreate {
    pub customer_id: CustomerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_usage_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyItem {
    pub item_id: ItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_image_url: Option<String>,
    #[serde(default)]
    pub sub_category_name: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub total: f64,
}

fn default_quantity() -> u32 {
    1
}

/// Build record as returned by the per-customer listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub id: BuildId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub service_usage_id: Option<String>,
    #[serde(default)]
    pub items: Vec<AssemblyItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    pub assembly_id: BuildId,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub component_count: u32,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildTotal {
    pub assembly_id: BuildId,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub assembly_fee: f64,
    #[serde(default)]
    pub total_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCategory {
    pub value: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Catalog row from the component listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogComponent {
    pub id: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_image: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub is_selected: bool,
}

/// Paging and sorting for the catalog browse endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentQuery {
    pub page_number: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub sort_by: String,
    pub sort_desc: bool,
}

impl Default for ComponentQuery {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 20,
            search: None,
            sort_by: "name".to_string(),
            sort_desc: false,
        }
    }
}

impl ComponentQuery {
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("pageNumber", self.page_number.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("sortBy", self.sort_by.clone()),
            ("sortDesc", self.sort_desc.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub item_total: f64,
    #[serde(default)]
    pub is_custom_build: bool,
    #[serde(default)]
    pub assembly_fee: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub customer_id: CustomerId,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub sub_total: f64,
}

// --- Storage ---

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session store lock poisoned")]
    Poisoned,
}

/// Resolve the data directory (`$RIGBUILD_HOME`, else `~/.rigbuild/`).
pub fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("RIGBUILD_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rigbuild")
}

/// Write a file atomically (temp file + rename) so a concurrent reader never
/// sees a truncated document. Every write gets its own temp file, so two
/// processes saving the same path cannot rename each other's half-written data.
pub fn write_atomic(path: &Path, data: &str) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// --- Client settings ---

pub const DEFAULT_BASE_URL: &str = "https://localhost:7230/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout; `None` leaves the transport default in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl ClientSettings {
    /// `settings.json` under `home`, merged with environment overrides.
    pub fn load(home: &Path) -> Self {
        let mut settings = read_settings(&home.join("settings.json"));
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RIGBUILD_API_URL") {
            if self.set_base_url(&url) {
                info!("RIGBUILD_API_URL set, using {}", self.base_url);
            }
        }
        if let Some(raw) = lookup("RIGBUILD_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.timeout_secs = None,
                Ok(secs) => self.timeout_secs = Some(secs),
                Err(e) => warn!("Invalid RIGBUILD_TIMEOUT_SECS value {raw:?}: {e}"),
            }
        }
    }

    /// Replace the base URL with a trimmed `url`. Blank input is ignored.
    pub fn set_base_url(&mut self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        self.base_url = url.to_string();
        true
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

pub fn read_settings(path: &Path) -> ClientSettings {
    if !path.exists() {
        return ClientSettings::default();
    }
    fs::read_to_string(path)
        .ok()
        .and_then(|s| {
            serde_json::from_str(&s)
                .map_err(|e| warn!("Ignoring malformed {}: {e}", path.display()))
                .ok()
        })
        .unwrap_or_default()
}

pub fn write_settings(path: &Path, settings: &ClientSettings) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(settings)?;
    write_atomic(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str, product: Option<&str>, price: f64, discount: Option<f64>) -> BuildTableRow {
        BuildTableRow {
            component_type: kind.to_string(),
            component_display_name: kind.to_string(),
            product_id: product.map(ProductId::from),
            product_name: product.map(|p| format!("{p} name")),
            product_image_url: None,
            sub_category_name: None,
            status: "Approved".to_string(),
            price: Some(price),
            discount,
            has_component: product.is_some(),
            item_id: product.map(|p| ItemId::new(format!("item-{p}"))),
        }
    }

    #[test]
    fn line_item_applies_positive_discount() {
        let item = LineItem::from_row(&row("RAM", Some("p1"), 100.0, Some(15.0))).unwrap();
        assert_eq!(item.unit_price, 85.0);
        assert_eq!(item.line_total(), 85.0);

        let item = LineItem::from_row(&row("RAM", Some("p1"), 100.0, Some(0.0))).unwrap();
        assert_eq!(item.unit_price, 100.0);
    }

    #[test]
    fn empty_rows_are_not_line_items() {
        assert!(LineItem::from_row(&row("GPU", None, 0.0, None)).is_none());
        assert!(LineItem::from_row(&row("GPU", Some(""), 10.0, None)).is_none());
    }

    #[test]
    fn build_table_decodes_server_payload() {
        let raw = r#"{
            "assemblyId": "b-1",
            "components": [
                {"componentType": "Processor", "componentDisplayName": "Processor",
                 "productId": "p-1", "productName": "Ryzen 5", "status": "Approved",
                 "price": 200, "hasComponent": true, "itemId": "i-1"},
                {"componentType": "GraphicsCard", "componentDisplayName": "Graphics Card",
                 "status": "None", "hasComponent": false}
            ],
            "totalCost": 200, "assemblyFee": 50, "grandTotal": 250, "isComplete": false
        }"#;
        let table: BuildTable = serde_json::from_str(raw).unwrap();
        let items: Vec<LineItem> = table.line_items().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product.name, "Ryzen 5");
        assert_eq!(table.totals().grand_total, 250.0);
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let resp: GeneralResponse<BuildTable> =
            serde_json::from_str(r#"{"success": false, "message": "Build not found"}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
    }

    #[test]
    fn component_query_omits_empty_search() {
        let pairs = ComponentQuery::default().to_pairs();
        assert!(pairs.iter().all(|(k, _)| *k != "search"));
        assert!(pairs.contains(&("pageSize", "20".to_string())));

        let q = ComponentQuery {
            search: Some("ryzen".to_string()),
            ..Default::default()
        };
        assert!(q.to_pairs().contains(&("search", "ryzen".to_string())));
    }

    #[test]
    fn settings_overrides_apply_and_ignore_garbage() {
        let mut s = ClientSettings::default();
        s.apply_overrides(|k| match k {
            "RIGBUILD_API_URL" => Some("http://shop.test/api/".to_string()),
            "RIGBUILD_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(s.base_url(), "http://shop.test/api");
        assert_eq!(s.timeout_secs, None);

        s.apply_overrides(|k| (k == "RIGBUILD_TIMEOUT_SECS").then(|| "30".to_string()));
        assert_eq!(s.timeout_secs, Some(30));
    }

    #[test]
    fn explicit_base_url_is_trimmed_and_blank_is_ignored() {
        let mut s = ClientSettings::default();
        assert!(s.set_base_url("  http://cli.test/api/ \n"));
        assert_eq!(s.base_url, "http://cli.test/api/");
        assert_eq!(s.base_url(), "http://cli.test/api");

        assert!(!s.set_base_url("   "));
        assert_eq!(s.base_url(), "http://cli.test/api");
    }

    #[test]
    fn build_create_defaults_to_empty_customer() {
        let req = BuildCreate {
            name: Some("Gaming rig".to_string()),
            ..Default::default()
        };
        assert_eq!(req.customer_id, CustomerId::default());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["customerId"], "");
        assert!(json.get("budget").is_none());
    }

    #[test]
    fn concurrent_writers_never_fail_or_tear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        std::thread::scope(|scope| {
            for writer in 0..4 {
                let path = &path;
                scope.spawn(move || {
                    for n in 0..100 {
                        let doc = format!("{{\"writer\":{writer},\"n\":{n}}}");
                        write_atomic(path, &doc).unwrap();
                    }
                });
            }
            let path = &path;
            scope.spawn(move || {
                for _ in 0..200 {
                    if let Ok(raw) = fs::read_to_string(path) {
                        serde_json::from_str::<serde_json::Value>(&raw).unwrap();
                    }
                }
            });
        });
        let last: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(last["n"], 99);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(read_settings(&path), ClientSettings::default());

        let s = ClientSettings {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: Some(10),
        };
        write_settings(&path, &s).unwrap();
        assert_eq!(read_settings(&path), s);
    }
}
