use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rigbuild_client::bootstrap::{self, BuildDraft, Entry};
use rigbuild_client::notify::Level;
use rigbuild_client::picker::{Picked, Picker};
use rigbuild_client::selector::Selector;
use rigbuild_client::{ApiError, Context, HttpClient, Recorder, Reply};
use rigbuild_core::session::{FileStore, Session};
use rigbuild_core::slots::{Slot, SlotBoard, SlotState};
use rigbuild_core::{BuildId, BuildRecord, ClientSettings, CustomerId, ProductId, Totals};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// --- Command line ---

#[derive(Parser)]
#[command(name = "rigbuild-mcp", version)]
#[command(about = "MCP server for the rigbuild PC-build workflow")]
struct Cli {
    /// Storefront API base URL. Overrides settings.json and RIGBUILD_API_URL.
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Data directory holding settings.json and session.json. Overrides RIGBUILD_HOME.
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve MCP over stdio (default).
    Serve,
    /// Register this server in the current project's .mcp.json and .codex/config.toml.
    Init,
}

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SignInRequest {
    /// Customer id issued by the storefront login
    customer_id: String,
    /// Bearer token from the login response
    token: Option<String>,
    /// Build id handed out at login, if any
    build_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct StartBuildRequest {
    /// Optional build name
    name: Option<String>,
    description: Option<String>,
    /// Budget in store currency
    budget: Option<f64>,
    /// PC-assembly service usage id
    service_usage_id: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SlotRequest {
    /// Slot name ("Processor", "GraphicsCard", "RAM", ...) or server category label ("Graphics Cards")
    slot: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct PickRequest {
    /// Slot name or server category label
    slot: String,
    /// Product id from list_compatible
    product_id: String,
}

// --- Server ---

const INSTRUCTIONS: &str = r#"Drives a PC build on the storefront.

1. `sign_in` with the customer id (and token) from the storefront login.
2. `start_build` once; the build id is cached and reused afterwards. `my_builds` lists the customer's builds.
3. `show_build` lists the fixed slots and totals. `list_compatible` shows what fits a slot, `pick_component` adds one, `remove_component` empties a slot.
4. `move_to_cart` hands the build to the cart. It is sent exactly once per call; do not repeat it unless the user asks.

Every answer reflects a fresh read of the server's build table."#;

#[derive(Clone)]
pub struct RigbuildServer {
    tool_router: ToolRouter<Self>,
    ctx: Context,
    http: Arc<HttpClient>,
    notices: Arc<Recorder>,
}

#[tool_router]
impl RigbuildServer {
    pub fn new(http: HttpClient) -> Self {
        let notices = Arc::new(Recorder::new());
        let session = http.session().clone();
        let http = Arc::new(http);
        let ctx = Context::new(session, http.clone(), http.clone(), notices.clone());
        Self {
            tool_router: Self::tool_router(),
            ctx,
            http,
            notices,
        }
    }

    #[tool(description = "Record the signed-in customer (and token) for this workspace")]
    async fn sign_in(
        &self,
        Parameters(req): Parameters<SignInRequest>,
    ) -> Result<CallToolResult, McpError> {
        let customer = CustomerId::from(req.customer_id.trim());
        let build = req
            .build_id
            .filter(|b| !b.trim().is_empty())
            .map(BuildId::from);
        if let Err(e) = self.ctx.session.sign_in(customer.clone(), req.token, build) {
            return Ok(self.fail(format!("Failed to save session: {e}")));
        }
        info!(%customer, "signed in");
        let cart = self.ctx.cart.refresh().await;
        Ok(self.done(format!(
            "Signed in as {customer}. Cart: {} item(s), ${:.2}.",
            cart.item_count, cart.total_price
        )))
    }

    #[tool(description = "Forget the customer, token and cached build id")]
    async fn logout(&self) -> Result<CallToolResult, McpError> {
        match self.ctx.session.logout() {
            Ok(()) => Ok(self.done("Logged out.".to_string())),
            Err(e) => Ok(self.fail(format!("Failed to clear session: {e}"))),
        }
    }

    #[tool(
        description = "Create a build for the signed-in customer and cache its id. Returns the cached build if one exists."
    )]
    async fn start_build(
        &self,
        Parameters(req): Parameters<StartBuildRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = BuildDraft {
            name: req.name,
            description: req.description,
            budget: req.budget,
            service_usage_id: req.service_usage_id,
        };
        match bootstrap::start_build(&self.ctx, draft).await {
            Ok(id) => Ok(self.done(format!("Build {id} is ready. Use show_build to see its slots."))),
            Err(e) => Ok(self.fail(format!("Could not start a build: {e}"))),
        }
    }

    #[tool(description = "Show every slot of the cached build with its component, plus totals")]
    async fn show_build(&self) -> Result<CallToolResult, McpError> {
        match bootstrap::entry(&self.ctx.session) {
            Ok(Entry::StartBuild) => {
                return Ok(self.fail("No build yet. Use start_build first.".to_string()))
            }
            Ok(Entry::Selector(_)) => {}
            Err(e) => return Ok(self.fail(e.to_string())),
        }
        match Selector::open(self.ctx.clone(), None).await {
            Ok(sel) => Ok(self.selector_result(&sel)),
            Err(e) => Ok(self.fail(e.to_string())),
        }
    }

    #[tool(description = "List the component categories the storefront offers")]
    async fn list_categories(&self) -> Result<CallToolResult, McpError> {
        match self.http.categories().await.and_then(Reply::into_result) {
            Ok(categories) => {
                let lines: Vec<String> = categories
                    .iter()
                    .map(|c| {
                        let slot = c
                            .name
                            .parse::<Slot>()
                            .or_else(|_| c.value.parse::<Slot>())
                            .map(|s| format!("slot {s}"))
                            .unwrap_or_else(|_| "not part of the build flow".to_string());
                        format!("{} ({}): {slot}", display_name(c), c.value)
                    })
                    .collect();
                Ok(self.done(lines.join("\n")))
            }
            Err(e) => Ok(self.fail(format!("Failed to load categories: {e}"))),
        }
    }

    #[tool(description = "List products compatible with the cached build for one slot")]
    async fn list_compatible(
        &self,
        Parameters(req): Parameters<SlotRequest>,
    ) -> Result<CallToolResult, McpError> {
        let slot = match req.slot.parse::<Slot>() {
            Ok(s) => s,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let picker = match Picker::open(self.ctx.clone(), slot).await {
            Ok(p) => p,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        if picker.products().is_empty() {
            let msg = picker
                .error()
                .unwrap_or("No PC build found. Please start a new build.");
            return Ok(self.fail(msg.to_string()));
        }
        let mut lines: Vec<String> = picker
            .products()
            .iter()
            .map(|p| {
                let mut line = format!("{}  {}  ${:.2}", p.id, p.name, p.effective_price());
                if p.effective_price() < p.price {
                    line.push_str(&format!(" (was ${:.2})", p.price));
                }
                if let Some(brand) = &p.tech_company_name {
                    line.push_str(&format!("  by {brand}"));
                }
                line
            })
            .collect();
        if let Some(err) = picker.error() {
            lines.push(format!("Note: {err}"));
        }
        Ok(self.done(lines.join("\n")))
    }

    #[tool(
        description = "Add a product to a slot of the cached build, then show the reconciled build"
    )]
    async fn pick_component(
        &self,
        Parameters(req): Parameters<PickRequest>,
    ) -> Result<CallToolResult, McpError> {
        let slot = match req.slot.parse::<Slot>() {
            Ok(s) => s,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let mut picker = match Picker::open(self.ctx.clone(), slot).await {
            Ok(p) => p,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let picked = match picker.select(&ProductId::from(req.product_id.trim())).await {
            Ok(picked) => picked,
            Err(e) => {
                let msg = picker.error().map(str::to_string).unwrap_or(e.to_string());
                return Ok(self.fail(msg));
            }
        };
        match Selector::open(self.ctx.clone(), Some(picked)).await {
            Ok(sel) => Ok(self.selector_result(&sel)),
            Err(e) => Ok(self.fail(e.to_string())),
        }
    }

    #[tool(description = "Remove the component held by a slot, then show the reconciled build")]
    async fn remove_component(
        &self,
        Parameters(req): Parameters<SlotRequest>,
    ) -> Result<CallToolResult, McpError> {
        let slot = match req.slot.parse::<Slot>() {
            Ok(s) => s,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let mut sel = match Selector::open(self.ctx.clone(), None).await {
            Ok(sel) => sel,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        match sel.remove(slot).await {
            Ok(()) => Ok(self.selector_result(&sel)),
            Err(e) => Ok(self.fail(format!("Could not remove {slot}: {e}"))),
        }
    }

    #[tool(
        description = "Convert the cached build into a cart entry. Sent once per call; never repeat without the user asking."
    )]
    async fn move_to_cart(&self) -> Result<CallToolResult, McpError> {
        let mut sel = match Selector::open(self.ctx.clone(), None).await {
            Ok(sel) => sel,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        match sel.add_to_cart().await {
            Ok(cart) => Ok(self.done(format!(
                "Cart now holds {} item(s), ${:.2}.",
                cart.item_count, cart.total_price
            ))),
            Err(e) => Ok(self.fail(format!("Build not added to cart: {e}"))),
        }
    }

    #[tool(description = "Item count and total of the signed-in customer's cart")]
    async fn cart_summary(&self) -> Result<CallToolResult, McpError> {
        match self.ctx.session.customer_id() {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(self.fail("Not signed in. Use sign_in first.".to_string())),
            Err(e) => return Ok(self.fail(e.to_string())),
        }
        let cart = self.ctx.cart.refresh().await;
        Ok(self.done(format!(
            "{} item(s), ${:.2}",
            cart.item_count, cart.total_price
        )))
    }

    #[tool(description = "List the signed-in customer's builds. The cached build is marked with *")]
    async fn my_builds(&self) -> Result<CallToolResult, McpError> {
        let customer = match self.ctx.session.customer_id() {
            Ok(Some(c)) => c,
            Ok(None) => return Ok(self.fail("Not signed in. Use sign_in first.".to_string())),
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let cached = match self.ctx.session.build_id() {
            Ok(id) => id,
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        match self
            .http
            .builds_for_customer(&customer)
            .await
            .and_then(Reply::into_result)
        {
            Ok(builds) if builds.is_empty() => {
                Ok(self.done("No builds yet. Use start_build first.".to_string()))
            }
            Ok(builds) => Ok(self.done(render_builds(&builds, cached.as_ref()))),
            Err(e) => Ok(self.fail(format!("Failed to load builds: {e}"))),
        }
    }

    #[tool(description = "Server-side status and totals of the cached build")]
    async fn build_status(&self) -> Result<CallToolResult, McpError> {
        let build = match self.ctx.session.build_id() {
            Ok(Some(id)) => id,
            Ok(None) => return Ok(self.fail("No build yet. Use start_build first.".to_string())),
            Err(e) => return Ok(self.fail(e.to_string())),
        };
        let status = match self.http.build_status(&build).await.and_then(Reply::into_result) {
            Ok(s) => s,
            Err(e) => return Ok(self.fail(format!("Failed to load build status: {e}"))),
        };
        let mut text = format!(
            "Build {}: {} with {} component(s), complete: {}",
            status.assembly_id,
            status.status,
            status.component_count,
            if status.is_complete { "yes" } else { "no" }
        );
        match self.http.build_total(&build).await.and_then(Reply::into_result) {
            Ok(total) => text.push_str(&format!(
                "\nSubtotal ${:.2}, assembly fee ${:.2}, total ${:.2}",
                total.subtotal, total.assembly_fee, total.total_amount
            )),
            Err(e) => text.push_str(&format!("\nTotals unavailable: {e}")),
        }
        Ok(self.done(text))
    }
}

impl RigbuildServer {
    fn done(&self, text: String) -> CallToolResult {
        CallToolResult::success(vec![Content::text(self.with_notices(text))])
    }

    fn fail(&self, text: String) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.with_notices(text))])
    }

    fn with_notices(&self, mut text: String) -> String {
        let notices = self.notices.drain();
        if !notices.is_empty() {
            text.push_str("\n\nNotices:");
            for n in notices {
                let tag = match n.level {
                    Level::Success => "ok",
                    Level::Error => "error",
                };
                text.push_str(&format!("\n- [{tag}] {}", n.message));
            }
        }
        text
    }

    fn selector_result(&self, sel: &Selector) -> CallToolResult {
        self.done(render_build(
            sel.build_id(),
            sel.board(),
            sel.pending(),
            sel.totals(),
            sel.is_complete(),
        ))
    }
}

#[tool_handler]
impl ServerHandler for RigbuildServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Rendering ---

fn display_name(c: &rigbuild_core::ComponentCategory) -> &str {
    if c.display_name.is_empty() {
        &c.name
    } else {
        &c.display_name
    }
}

fn render_build(
    build: Option<&BuildId>,
    board: &SlotBoard,
    pending: Option<&Picked>,
    totals: Option<Totals>,
    complete: bool,
) -> String {
    let Some(build) = build else {
        return "No build yet. Use start_build first.".to_string();
    };
    let mut out = format!(
        "Build {build} ({} of {} slots filled, complete: {})\n",
        board.selected_count(),
        Slot::ALL.len(),
        if complete { "yes" } else { "no" }
    );
    for (slot, state) in board.iter() {
        let line = match state {
            SlotState::Selected(item) => format!(
                "{:<13} {}  ${:.2}",
                slot.as_str(),
                item.product.name,
                item.line_total()
            ),
            SlotState::Empty => match pending.filter(|p| p.slot == slot) {
                Some(p) => format!("{:<13} (empty, {} pending)", slot.as_str(), p.product.name),
                None => format!("{:<13} (empty)", slot.as_str()),
            },
        };
        out.push_str(&line);
        out.push('\n');
    }
    if !board.dropped().is_empty() {
        let rows: Vec<String> = board
            .dropped()
            .iter()
            .map(|d| format!("{} ({})", d.item.product.name, d.label))
            .collect();
        out.push_str(&format!("Not shown in a slot: {}\n", rows.join(", ")));
    }
    match totals {
        Some(t) => out.push_str(&format!(
            "Subtotal ${:.2}, assembly fee ${:.2}, total ${:.2}",
            t.subtotal, t.assembly_fee, t.grand_total
        )),
        None => out.push_str("Totals not loaded."),
    }
    out
}

fn render_builds(builds: &[BuildRecord], cached: Option<&BuildId>) -> String {
    builds
        .iter()
        .map(|b| {
            let marker = if cached == Some(&b.id) { '*' } else { ' ' };
            let total: f64 = b.items.iter().map(|i| i.total).sum();
            format!(
                "{marker} {}  {}  {} component(s), ${total:.2}",
                b.id,
                b.name.as_deref().unwrap_or("(unnamed)"),
                b.items.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// --- Entry point ---

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let home = cli.home.clone().unwrap_or_else(rigbuild_core::data_dir);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Init => {
            let binary_path = std::env::current_exe()?
                .canonicalize()?
                .to_string_lossy()
                .to_string();
            let args = server_args(cli.api_url.as_deref(), cli.home.as_deref());
            init_project(&std::env::current_dir()?, &binary_path, &args)
        }
        Command::Serve => serve(&home, cli.api_url).await,
    }
}

/// Settings file and environment, then `--api-url` on top.
fn resolve_settings(home: &Path, api_url: Option<&str>) -> ClientSettings {
    let mut settings = ClientSettings::load(home);
    if let Some(url) = api_url {
        settings.set_base_url(url);
    }
    settings
}

async fn serve(home: &Path, api_url: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let settings = resolve_settings(home, api_url.as_deref());

    let store = FileStore::new(home.join("session.json"));
    info!(
        api = settings.base_url(),
        session = %store.path().display(),
        "rigbuild-mcp starting"
    );
    let session = Session::new(Arc::new(store));
    let http = HttpClient::new(&settings, session).map_err(|e: ApiError| {
        error!("cannot build HTTP client: {e}");
        e
    })?;

    let service = RigbuildServer::new(http)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| error!("MCP server error: {e}"))?;
    service.waiting().await?;
    Ok(())
}

// --- init ---

fn server_args(api_url: Option<&str>, home: Option<&Path>) -> Vec<String> {
    let mut args = vec!["serve".to_string()];
    if let Some(url) = api_url {
        args.push("--api-url".to_string());
        args.push(url.to_string());
    }
    if let Some(home) = home {
        args.push("--home".to_string());
        args.push(home.to_string_lossy().to_string());
    }
    args
}

/// Write project-scoped MCP config so local agent hosts start this server
/// when working in `cwd`. Existing entries for other servers are kept.
fn init_project(
    cwd: &Path,
    binary_path: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    init_mcp_json(cwd, binary_path, args)?;
    init_codex(cwd, binary_path, args)?;
    eprintln!("\nDone. rigbuild is registered for this project.");
    Ok(())
}

fn init_mcp_json(
    cwd: &Path,
    binary_path: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mcp_json_path = cwd.join(".mcp.json");
    let mut root: serde_json::Value = if mcp_json_path.exists() {
        let contents = std::fs::read_to_string(&mcp_json_path)?;
        serde_json::from_str(&contents).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };

    if !root.get("mcpServers").is_some_and(|v| v.is_object()) {
        root["mcpServers"] = serde_json::json!({});
    }
    root["mcpServers"]["rigbuild"] = serde_json::json!({
        "type": "stdio",
        "command": binary_path,
        "args": args,
    });

    std::fs::write(&mcp_json_path, serde_json::to_string_pretty(&root)?)?;
    eprintln!("Wrote {}", mcp_json_path.display());
    Ok(())
}

fn init_codex(
    cwd: &Path,
    binary_path: &str,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let codex_dir = cwd.join(".codex");
    let config_toml_path = codex_dir.join("config.toml");

    let mut doc: toml_edit::DocumentMut = if config_toml_path.exists() {
        std::fs::read_to_string(&config_toml_path)?
            .parse()
            .unwrap_or_default()
    } else {
        toml_edit::DocumentMut::new()
    };

    if !doc.contains_table("mcp_servers") {
        doc["mcp_servers"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let mut arr = toml_edit::Array::new();
    for a in args {
        arr.push(a.as_str());
    }
    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(binary_path));
    server.insert("args", toml_edit::value(arr));
    doc["mcp_servers"]["rigbuild"] = toml_edit::Item::Table(server);

    std::fs::create_dir_all(&codex_dir)?;
    std::fs::write(&config_toml_path, doc.to_string())?;
    eprintln!("Wrote {}", config_toml_path.display());
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use rigbuild_core::{BuildTable, BuildTableRow, ItemId, Product};

    fn row(label: &str, product: &str, name: &str, price: f64) -> BuildTableRow {
        BuildTableRow {
            component_type: label.to_string(),
            component_display_name: label.to_string(),
            product_id: Some(ProductId::from(product)),
            product_name: Some(name.to_string()),
            product_image_url: None,
            sub_category_name: None,
            status: "Approved".to_string(),
            price: Some(price),
            discount: None,
            has_component: true,
            item_id: Some(ItemId::new(format!("item-{product}"))),
        }
    }

    #[test]
    fn render_lists_slots_totals_and_dropped_rows() {
        let table = BuildTable {
            assembly_id: BuildId::from("b-1"),
            components: vec![
                row("Processors", "p-1", "Ryzen 5", 200.0),
                row("RAM", "r-1", "16GB Kit", 80.0),
                row("Laptop", "l-1", "Travel laptop", 900.0),
            ],
            total_cost: 280.0,
            assembly_fee: 50.0,
            grand_total: 330.0,
            is_complete: false,
        };
        let board = SlotBoard::from_table(&table);
        let pending = Picked {
            slot: Slot::Storage,
            product: Product {
                id: ProductId::from("s-1"),
                name: "1TB NVMe".to_string(),
                price: 70.0,
                discount_price: None,
                image_url: None,
                category: None,
                category_name: None,
                sub_category_name: None,
                tech_company_name: None,
                stock: None,
                specifications: vec![],
            },
        };

        let text = render_build(
            Some(&table.assembly_id),
            &board,
            Some(&pending),
            Some(table.totals()),
            table.is_complete,
        );
        assert!(text.starts_with("Build b-1 (2 of 11 slots filled"));
        assert!(text.contains("Ryzen 5  $200.00"));
        assert!(text.contains("(empty, 1TB NVMe pending)"));
        assert!(text.contains("Not shown in a slot: Travel laptop (Laptop)"));
        assert!(text.ends_with("total $330.00"));
    }

    #[test]
    fn builds_listing_marks_the_cached_build() {
        let builds: Vec<BuildRecord> = serde_json::from_str(
            r#"[{"id":"b-1","name":"Gaming rig","customerId":"c-1",
                 "items":[{"itemId":"i-1","productId":"p-1","total":200},
                          {"itemId":"i-2","productId":"r-1","total":80}]},
                {"id":"b-2","customerId":"c-1"}]"#,
        )
        .unwrap();
        let text = render_builds(&builds, Some(&BuildId::from("b-2")));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "  b-1  Gaming rig  2 component(s), $280.00");
        assert_eq!(lines[1], "* b-2  (unnamed)  0 component(s), $0.00");
    }

    #[test]
    fn cli_api_url_is_trimmed_over_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        rigbuild_core::write_settings(
            &dir.path().join("settings.json"),
            &ClientSettings {
                base_url: "http://file.test/api".to_string(),
                timeout_secs: Some(9),
            },
        )
        .unwrap();

        let s = resolve_settings(dir.path(), Some("  http://cli.test/api/\n"));
        assert_eq!(s.base_url(), "http://cli.test/api");
        assert_eq!(s.timeout_secs, Some(9));

        let s = resolve_settings(dir.path(), Some("   "));
        assert_eq!(s.base_url(), "http://file.test/api");
    }

    #[test]
    fn render_without_build() {
        let text = render_build(None, &SlotBoard::empty(), None, None, false);
        assert_eq!(text, "No build yet. Use start_build first.");
    }

    #[test]
    fn init_merges_existing_configs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".mcp.json"),
            r#"{"mcpServers":{"other":{"command":"x"}}}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join(".codex")).unwrap();
        std::fs::write(
            dir.path().join(".codex/config.toml"),
            "[mcp_servers.other]\ncommand = \"x\"\n",
        )
        .unwrap();

        let args = server_args(Some("http://shop.test/api"), None);
        init_project(dir.path(), "/usr/bin/rigbuild-mcp", &args).unwrap();

        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(".mcp.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["mcpServers"]["other"]["command"], "x");
        assert_eq!(json["mcpServers"]["rigbuild"]["command"], "/usr/bin/rigbuild-mcp");
        assert_eq!(json["mcpServers"]["rigbuild"]["args"][2], "http://shop.test/api");

        let toml = std::fs::read_to_string(dir.path().join(".codex/config.toml")).unwrap();
        let doc: toml_edit::DocumentMut = toml.parse().unwrap();
        assert_eq!(doc["mcp_servers"]["other"]["command"].as_str(), Some("x"));
        assert_eq!(
            doc["mcp_servers"]["rigbuild"]["command"].as_str(),
            Some("/usr/bin/rigbuild-mcp")
        );
    }

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["rigbuild-mcp"]).unwrap();
        assert!(cli.command.is_none());

        let cli =
            Cli::try_parse_from(["rigbuild-mcp", "init", "--api-url", "http://x/api"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Init)));
        assert_eq!(cli.api_url.as_deref(), Some("http://x/api"));
    }
}
