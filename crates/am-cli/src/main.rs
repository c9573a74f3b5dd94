//! CLI entry point for the asset manager.
//!
//! `assetctl` signs in against the asset manager backend, keeps the session
//! in a local storage file, and exposes the everyday read and write paths.
//!
//! # Usage
//!
//! ```bash
//! assetctl [OPTIONS] <COMMAND>
//!
//! # Sign in (the session is kept between runs)
//! assetctl login --email admin@result-education.ru --password admin123
//!
//! # Browse assets, sorted locally by cost
//! assetctl assets list --search ноутбук --sort cost --desc
//!
//! # Record a transfer between warehouses
//! assetctl operations create transfer --asset 12 --quantity 3 --from 1 --to 2
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use am_client::{ApiClient, Notifier, TracingNotifier};
use am_core::format::{DateFormat, format_currency, format_date, format_number, format_percentage};
use am_core::{
    Asset, AssetCategory, AssetQuery, AssetStatus, Config, Credentials, NewOperation, Operation, OperationQuery,
    OperationType,
};
use am_session::access::navigation_for;
use am_session::query::PaginatedQuery;
use am_session::table::TableState;
use am_session::{AuthStatus, Session};
use am_storage::Store;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, eyre};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Command-line client for the asset manager.
#[derive(Parser)]
#[command(name = "assetctl", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "AM_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Backend base URL (overrides the configuration file).
    #[arg(long, global = true, env = "AM_API_URL")]
    api_url: Option<String>,

    /// Storage file holding the session (overrides the configuration file).
    #[arg(long, global = true, env = "AM_STORAGE_PATH")]
    storage: Option<Utf8PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Sign in and keep the session.
    Login {
        /// Login e-mail.
        #[arg(short, long, env = "AM_EMAIL")]
        email: String,

        /// Password.
        #[arg(short, long, env = "AM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Show the sections and permissions of the signed-in user.
    Permissions,

    /// Browse assets.
    #[command(subcommand)]
    Assets(AssetCommand),

    /// Browse and record inventory operations.
    #[command(subcommand)]
    Operations(OperationCommand),

    /// Show dashboard statistics.
    Dashboard,

    /// Download an export file.
    Export {
        /// What to export.
        #[arg(value_enum)]
        kind: ExportKind,

        /// Directory the file is written to.
        #[arg(short, long, default_value = ".")]
        dir: Utf8PathBuf,
    },
}

/// Asset subcommands.
#[derive(Subcommand)]
enum AssetCommand {
    /// List one page of assets.
    List(AssetListArgs),

    /// Show one asset.
    Show {
        /// Asset identifier.
        id: i64,
    },
}

#[derive(Args)]
struct AssetListArgs {
    /// Free-text search.
    #[arg(short, long)]
    search: Option<String>,

    /// Restrict to a category.
    #[arg(long)]
    category: Option<AssetCategory>,

    /// Restrict to a status.
    #[arg(long)]
    status: Option<AssetStatus>,

    /// Restrict to a warehouse.
    #[arg(long)]
    warehouse: Option<i64>,

    /// Page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Page size (defaults to the configured size).
    #[arg(long)]
    size: Option<u32>,

    /// Sort the page by a column (name, cost, quantity, total_value, ...).
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    desc: bool,
}

/// Operation subcommands.
#[derive(Subcommand)]
enum OperationCommand {
    /// List operations.
    List {
        /// Restrict to one kind.
        #[arg(long = "type")]
        kind: Option<OperationType>,

        /// Earliest date, `YYYY-MM-DD`.
        #[arg(long)]
        since: Option<NaiveDate>,

        /// Latest date, `YYYY-MM-DD`.
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Maximum number of records.
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },

    /// Record an operation.
    Create(NewOperationArgs),
}

#[derive(Args)]
struct NewOperationArgs {
    /// Operation kind.
    #[arg(value_enum)]
    kind: OperationKind,

    /// Affected asset.
    #[arg(long)]
    asset: i64,

    /// Number of units.
    #[arg(long)]
    quantity: i64,

    /// Source warehouse.
    #[arg(long)]
    from: Option<i64>,

    /// Destination warehouse.
    #[arg(long)]
    to: Option<i64>,

    /// Unit cost before an adjustment.
    #[arg(long)]
    cost_before: Option<f64>,

    /// Unit cost after an adjustment.
    #[arg(long)]
    cost_after: Option<f64>,

    /// Reason.
    #[arg(long)]
    reason: Option<String>,

    /// Supporting document number.
    #[arg(long)]
    document: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OperationKind {
    Receipt,
    Transfer,
    Disposal,
    Adjustment,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Assets,
    Operations,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise uses `debug` with `--verbose` and
/// `info` by default, with the HTTP stack filtered to `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads the configuration: file, then environment, then flags.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result is invalid.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(url) = &cli.api_url {
        config.api.base_url.clone_from(url);
    }
    if let Some(path) = &cli.storage {
        config.storage.path.clone_from(path);
    }
    config.validate()?;
    debug!(base_url = %config.api.base_url, storage = %config.storage.path, "configuration loaded");
    Ok(config)
}

/// Opens the storage file and builds a session over the HTTP client.
fn build_session(config: &Config) -> color_eyre::Result<Session> {
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let client = ApiClient::from_config(config)?.with_notifier(notifier);
    let store = Arc::new(Store::from_config(&config.storage)?);
    Ok(Session::new(client, store))
}

/// Restores the stored session, failing when nobody is signed in.
async fn require_login(session: &Session) -> color_eyre::Result<()> {
    match session.check_auth().await {
        AuthStatus::Authenticated => Ok(()),
        status => {
            debug!(%status, "no usable session");
            bail!("Not signed in. Run `assetctl login` first.")
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn run_login(session: &Session, email: &str, password: &str) -> color_eyre::Result<()> {
    let outcome = session.login(&Credentials::new(email, password)).await;
    if !outcome.success {
        return Err(eyre!(outcome.error.unwrap_or_default()));
    }
    if let Some(user) = session.user_display() {
        info!(user = %user.name, role = %user.role, "signed in");
    }
    Ok(())
}

async fn run_whoami(session: &Session, json: bool) -> color_eyre::Result<()> {
    require_login(session).await?;
    let Some(user) = session.user() else {
        bail!("Not signed in.");
    };
    if json {
        return print_json(&user);
    }

    let display = session.user_display();
    let mut out = std::io::stdout().lock();
    writeln!(out, "{} <{}>", user.username, user.email)?;
    if let Some(display) = display {
        writeln!(out, "  Initials:   {}", display.initials)?;
    }
    writeln!(out, "  Role:       {}", user.role.label())?;
    if let Some(company) = user.company_id {
        writeln!(out, "  Company:    {company}")?;
    }
    if let Some(expires) = session.token_expires_at() {
        writeln!(out, "  Expires:    {}", format_date(Some(expires), DateFormat::DisplayWithTime))?;
    }
    Ok(())
}

async fn run_permissions(session: &Session, json: bool) -> color_eyre::Result<()> {
    require_login(session).await?;
    let Some(user) = session.user() else {
        bail!("Not signed in.");
    };
    let sections = navigation_for(user.role);

    if json {
        #[derive(Serialize)]
        struct Access<'a> {
            role: &'a str,
            sections: Vec<&'a str>,
            permissions: Vec<&'a str>,
        }
        return print_json(&Access {
            role: user.role.as_str(),
            sections: sections.iter().map(|s| s.id()).collect(),
            permissions: user.role.permissions().iter().map(|p| p.as_str()).collect(),
        });
    }

    let mut out = std::io::stdout().lock();
    writeln!(out, "Role: {}", user.role.label())?;
    writeln!(out)?;
    writeln!(out, "Sections:")?;
    for section in &sections {
        writeln!(out, "  {:<22} {}", section.label(), section.path())?;
    }
    writeln!(out)?;
    writeln!(out, "Permissions:")?;
    for permission in user.role.permissions() {
        writeln!(out, "  {}", permission.as_str())?;
    }
    Ok(())
}

async fn run_assets(session: &Session, config: &Config, command: AssetCommand, json: bool) -> color_eyre::Result<()> {
    require_login(session).await?;
    let client = session.client();

    match command {
        AssetCommand::Show { id } => {
            let asset = client.assets().get(id).await?;
            if json {
                return print_json(&asset);
            }
            print_asset(&asset)
        }
        AssetCommand::List(args) => {
            let filters = AssetQuery {
                search: args.search,
                category: args.category,
                status: args.status,
                warehouse_id: args.warehouse,
                ..AssetQuery::default()
            };
            let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
            let assets = PaginatedQuery::new(notifier, &config.pagination, filters);
            if let Some(size) = args.size {
                assets.change_page_size(size);
            }
            assets.go_to_page(args.page);
            assets
                .fetch(|req| async move { client.assets().list(req.page_params(), &req.filters).await })
                .await?;

            let items = assets.items();
            let mut table = TableState::new(u32::try_from(items.len()).unwrap_or(u32::MAX));
            if let Some(key) = &args.sort {
                table.toggle_sort(key);
                if args.desc {
                    table.toggle_sort(key);
                }
            }
            let rows: Vec<&Asset> = table.view(&items).into_iter().map(|i| &items[i]).collect();

            if json {
                return print_json(&rows);
            }
            let info = assets.pagination();
            let mut out = std::io::stdout().lock();
            writeln!(out, "{:<6} {:<20} {:<32} {:>8} {:>16}  {}", "ID", "Инв. номер", "Наименование", "Кол-во", "Стоимость", "Статус")?;
            for asset in rows {
                writeln!(
                    out,
                    "{:<6} {:<20} {:<32} {:>8} {:>16}  {}",
                    asset.id,
                    asset.inventory_number,
                    truncate(&asset.name, 32),
                    asset.quantity,
                    format_currency(Some(asset.cost)),
                    asset.status.label(),
                )?;
            }
            writeln!(out)?;
            writeln!(out, "Page {} of {} ({} total)", info.page, info.pages.max(1), info.total)?;
            Ok(())
        }
    }
}

async fn run_operations(session: &Session, command: OperationCommand, json: bool) -> color_eyre::Result<()> {
    require_login(session).await?;
    let client = session.client();

    match command {
        OperationCommand::List { kind, since, until, limit } => {
            let query = OperationQuery {
                limit,
                operation_type: kind,
                start_date: since,
                end_date: until,
                ..OperationQuery::default()
            };
            let operations = client.operations().list(&query).await?;
            if json {
                return print_json(&operations);
            }
            print_operations(&operations)
        }
        OperationCommand::Create(args) => {
            let operation = new_operation(args)?;
            let report = operation.validate();
            if !report.is_valid() {
                bail!("Invalid operation: {report}");
            }
            let created = client.operations().create(&operation).await?;
            if json {
                return print_json(&created);
            }
            info!(id = created.id, kind = %created.kind, "operation recorded");
            print_operations(std::slice::from_ref(&created))
        }
    }
}

fn new_operation(args: NewOperationArgs) -> color_eyre::Result<NewOperation> {
    let missing = |flag: &str| eyre!("--{flag} is required for this operation");
    let operation = match args.kind {
        OperationKind::Receipt => NewOperation::receipt(args.asset, args.quantity, args.to.ok_or_else(|| missing("to"))?),
        OperationKind::Transfer => NewOperation::transfer(
            args.asset,
            args.quantity,
            args.from.ok_or_else(|| missing("from"))?,
            args.to.ok_or_else(|| missing("to"))?,
        ),
        OperationKind::Disposal => {
            NewOperation::disposal(args.asset, args.quantity, args.from.ok_or_else(|| missing("from"))?)
        }
        OperationKind::Adjustment => NewOperation::adjustment(
            args.asset,
            args.quantity,
            args.cost_before.ok_or_else(|| missing("cost-before"))?,
            args.cost_after.ok_or_else(|| missing("cost-after"))?,
        ),
    };
    let operation = match args.reason {
        Some(reason) => operation.with_reason(reason),
        None => operation,
    };
    Ok(match args.document {
        Some(number) => operation.with_document_number(number),
        None => operation,
    })
}

async fn run_dashboard(session: &Session, json: bool) -> color_eyre::Result<()> {
    require_login(session).await?;
    let dashboard = session.client().reports().dashboard().await?;
    if json {
        return print_json(&dashboard);
    }

    let stats = &dashboard.stats;
    #[allow(clippy::cast_precision_loss)]
    let total_assets = stats.total_assets as f64;
    let mut out = std::io::stdout().lock();
    writeln!(out, "Панель управления")?;
    writeln!(out, "=================")?;
    writeln!(out, "Всего активов:      {}", format_number(Some(total_assets)))?;
    writeln!(out, "Общая стоимость:    {}", format_currency(Some(stats.total_value)))?;
    writeln!(out, "Операций сегодня:   {}", stats.operations_today)?;
    writeln!(out, "Активных складов:   {}", stats.active_warehouses)?;
    writeln!(out, "Рост за месяц:      {}", format_percentage(Some(stats.monthly_growth), 1))?;

    if !dashboard.category_stats.is_empty() {
        writeln!(out)?;
        writeln!(out, "По категориям:")?;
        for category in &dashboard.category_stats {
            writeln!(
                out,
                "  {:<24} {:>6} {:>18}",
                category.category.label(),
                category.count,
                format_currency(Some(category.value)),
            )?;
        }
    }

    if !dashboard.recent_operations.is_empty() {
        writeln!(out)?;
        writeln!(out, "Последние операции:")?;
        print_operations(&dashboard.recent_operations)?;
    }
    Ok(())
}

async fn run_export(session: &Session, kind: ExportKind, dir: &Utf8Path) -> color_eyre::Result<()> {
    require_login(session).await?;
    let client = session.client();
    let download = match kind {
        ExportKind::Assets => client.assets().export(&AssetQuery::default()).await?,
        ExportKind::Operations => client.operations().export(&OperationQuery::default()).await?,
    };
    let path = download.save_to(dir).await?;
    info!(path = %path, bytes = download.bytes.len(), "export saved");
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> color_eyre::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_asset(asset: &Asset) -> color_eyre::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{} ({})", asset.name, asset.inventory_number)?;
    writeln!(out, "  Категория:   {}", asset.category.label())?;
    writeln!(out, "  Статус:      {}", asset.status.label())?;
    writeln!(out, "  Склад:       {}", asset.warehouse_id)?;
    writeln!(out, "  Количество:  {}", asset.quantity)?;
    writeln!(out, "  Цена:        {}", format_currency(Some(asset.cost)))?;
    writeln!(out, "  Стоимость:   {}", format_currency(Some(asset.total_value())))?;
    if let Some(serial) = &asset.serial_number {
        writeln!(out, "  Серийный №:  {serial}")?;
    }
    if let Some(supplier) = &asset.supplier {
        writeln!(out, "  Поставщик:   {supplier}")?;
    }
    if asset.purchase_date.is_some() {
        writeln!(out, "  Закупка:     {}", format_date(asset.purchase_date, DateFormat::Display))?;
    }
    if let Some(description) = &asset.description {
        writeln!(out)?;
        writeln!(out, "{description}")?;
    }
    Ok(())
}

fn print_operations(operations: &[Operation]) -> color_eyre::Result<()> {
    let mut out = std::io::stdout().lock();
    for op in operations {
        let route = match (op.from_warehouse_id, op.to_warehouse_id) {
            (Some(from), Some(to)) => format!("{from} → {to}"),
            (Some(from), None) => format!("{from} →"),
            (None, Some(to)) => format!("→ {to}"),
            (None, None) => String::new(),
        };
        writeln!(
            out,
            "{:<6} {:<16} {:<12} asset {:<6} x{:<6} {}",
            op.id,
            format_date(Some(op.operation_date), DateFormat::DisplayWithTime),
            op.kind.label(),
            op.asset_id,
            op.quantity,
            route,
        )?;
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    am_core::format::truncate(text, max, "…")
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = build_config(&cli)?;
    let session = build_session(&config)?;

    match cli.command {
        Commands::Login { email, password } => run_login(&session, &email, &password).await,
        Commands::Logout => {
            session.logout();
            Ok(())
        }
        Commands::Whoami => run_whoami(&session, cli.json).await,
        Commands::Permissions => run_permissions(&session, cli.json).await,
        Commands::Assets(command) => run_assets(&session, &config, command, cli.json).await,
        Commands::Operations(command) => run_operations(&session, command, cli.json).await,
        Commands::Dashboard => run_dashboard(&session, cli.json).await,
        Commands::Export { kind, dir } => run_export(&session, kind, &dir).await,
    }
}
