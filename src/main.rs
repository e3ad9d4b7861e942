use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use billed::bill::{
    list_bills, preview, validate_file_extension, BillForm, DisplayBill, ExpenseType,
    NewBillSession, ReceiptFile,
};
use billed::config::{config_dir, load_config, resolve_data_dir, Session, CONFIG_TEMPLATE};
use billed::error::{BilledError, Result};
use billed::store;

#[derive(Parser)]
#[command(name = "billed")]
#[command(version, about = "Expense report CLI: list, validate and submit bills", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.billed or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Act as this user instead of the session email from config.toml
    #[arg(long, global = true)]
    email: Option<String>,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// List your bills, most recent first
    List {
        /// Print bills as JSON
        #[arg(long)]
        json: bool,

        /// Number of bills to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Submit a new bill with its receipt
    New {
        /// Expense label
        #[arg(long)]
        name: String,

        /// Expense date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Expense type (see 'billed types')
        #[arg(long = "type", value_name = "TYPE")]
        expense_type: ExpenseType,

        /// Amount including taxes
        #[arg(long)]
        amount: String,

        /// VAT amount
        #[arg(long, default_value = "")]
        vat: String,

        /// VAT percentage (default: 20)
        #[arg(long, default_value = "")]
        pct: String,

        /// Free text comment
        #[arg(long, default_value = "")]
        commentary: String,

        /// Receipt image (jpg, jpeg or png)
        #[arg(long)]
        file: PathBuf,
    },

    /// Check whether a receipt file name is accepted
    CheckFile {
        /// File name to check
        name: String,
    },

    /// Show the receipt attached to a bill
    Receipt {
        /// Bill id from 'list'
        id: String,

        /// Open the receipt with the system default viewer
        #[arg(long)]
        open: bool,
    },

    /// List accepted expense types
    Types,

    /// Show session and store configuration
    Status,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };
    let email = cli.email.as_deref();

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::List { json, limit } => cmd_list(&cfg_dir, email, json, limit),
        Commands::New {
            name,
            date,
            expense_type,
            amount,
            vat,
            pct,
            commentary,
            file,
        } => {
            let form = BillForm {
                name,
                date,
                expense_type,
                amount,
                vat,
                pct,
                commentary,
            };
            cmd_new(&cfg_dir, email, &form, &file)
        }
        Commands::CheckFile { name } => cmd_check_file(&name),
        Commands::Receipt { id, open } => cmd_receipt(&cfg_dir, email, &id, open),
        Commands::Types => cmd_types(),
        Commands::Status => cmd_status(&cfg_dir, email),
    }
}

/// Initialize config directory with the template config
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(BilledError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized billed config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set your session email:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Submit a bill:           billed new --name ... --file receipt.jpg");
    println!("  3. Review your bills:       billed list");

    Ok(())
}

#[derive(Tabled)]
struct BillRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "TYPE")]
    expense_type: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "ID")]
    id: String,
}

#[derive(Tabled)]
struct TypeRow {
    #[tabled(rename = "SLUG")]
    slug: String,
    #[tabled(rename = "LABEL")]
    label: String,
}

fn open_session(cfg_dir: &Path, email: Option<&str>) -> Result<(Session, Box<dyn store::BillsStore>)> {
    let config = load_config(cfg_dir)?;
    let session = Session::from_config(&config, email);
    let store = store::open(&config, cfg_dir)?;
    Ok((session, store))
}

fn fetch_bills(cfg_dir: &Path, email: Option<&str>) -> Result<Vec<DisplayBill>> {
    let (session, store) = open_session(cfg_dir, email)?;
    Ok(list_bills(store.as_ref(), &session.email)?)
}

/// List the session user's bills
fn cmd_list(cfg_dir: &Path, email: Option<&str>, json: bool, limit: Option<usize>) -> Result<()> {
    let bills = fetch_bills(cfg_dir, email)?;
    let shown = match limit {
        Some(n) => &bills[..n.min(bills.len())],
        None => &bills[..],
    };

    if json {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if bills.is_empty() {
        println!("No bills yet.");
        println!("Submit one with: billed new --name <name> --date <YYYY-MM-DD> --type <type> --amount <amount> --file <receipt>");
        return Ok(());
    }

    let rows: Vec<BillRow> = shown
        .iter()
        .map(|b| BillRow {
            date: b.formatted_date.clone(),
            expense_type: b.bill.expense_type.label().to_string(),
            name: b.bill.name.clone(),
            amount: format!("{:.2} €", b.bill.amount),
            status: b.formatted_status.clone(),
            id: b.bill.id.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    println!();
    println!("Total: {} bills", bills.len());

    Ok(())
}

/// Upload the receipt and submit a new bill
fn cmd_new(cfg_dir: &Path, email: Option<&str>, form: &BillForm, file: &Path) -> Result<()> {
    let (session, store) = open_session(cfg_dir, email)?;

    let receipt = ReceiptFile::from_path(file)?;
    let mut new_bill = NewBillSession::new();
    new_bill.select_file(receipt)?;
    let file_name = new_bill.upload(store.as_ref())?.file_name.clone();
    let submission = new_bill.submit(store.as_ref(), form, &session.email)?;

    println!("Created bill {}", submission.created.id);
    println!("  Name:    {}", form.name);
    println!("  Type:    {}", form.expense_type);
    println!("  Receipt: {}", file_name);
    println!("  Next:    {}", submission.next.path());

    Ok(())
}

/// Check a receipt file name against the accepted extensions
fn cmd_check_file(name: &str) -> Result<()> {
    if !validate_file_extension(name) {
        return Err(BilledError::InvalidFileExtension(name.to_string()));
    }
    println!("'{name}' is an accepted receipt file");
    Ok(())
}

/// Show (and optionally open) a bill's receipt
fn cmd_receipt(cfg_dir: &Path, email: Option<&str>, id: &str, open: bool) -> Result<()> {
    let bills = fetch_bills(cfg_dir, email)?;
    let bill = bills
        .iter()
        .find(|b| b.bill.id.as_deref() == Some(id))
        .ok_or_else(|| BilledError::BillNotFound(id.to_string()))?;

    let receipt = preview(&bill.bill)?;
    println!("Receipt for {}: {}", id, receipt.file_name);
    println!("  URL: {}", receipt.url);

    if open {
        open_path(&receipt.url)?;
    }
    Ok(())
}

fn open_path(target: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(target)
            .spawn()
            .map_err(BilledError::Io)?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(target)
            .spawn()
            .map_err(BilledError::Io)?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", target])
            .spawn()
            .map_err(BilledError::Io)?;
    }
    Ok(())
}

/// List accepted expense types
fn cmd_types() -> Result<()> {
    let rows: Vec<TypeRow> = ExpenseType::ALL
        .iter()
        .map(|t| TypeRow {
            slug: t.slug().to_string(),
            label: t.label().to_string(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

/// Show session and store configuration
fn cmd_status(cfg_dir: &Path, email: Option<&str>) -> Result<()> {
    let config = load_config(cfg_dir)?;
    let session = Session::from_config(&config, email);

    println!("Billed Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("User:             {} ({})", session.email, session.user_type);
    println!("Store backend:    {}", config.store.backend);
    match config.store.backend.as_str() {
        "http" => println!(
            "API:              {}",
            config.store.base_url.as_deref().unwrap_or("(not set)")
        ),
        _ => println!(
            "Data directory:   {}",
            resolve_data_dir(&config.store.data_dir, cfg_dir).display()
        ),
    }

    let store = store::open(&config, cfg_dir)?;
    let bills = list_bills(store.as_ref(), &session.email)?;
    println!("Bills:            {}", bills.len());

    if let Some(latest) = bills.first() {
        println!();
        println!(
            "Latest: {} - {} - {:.2} € ({})",
            latest.formatted_date, latest.bill.name, latest.bill.amount, latest.formatted_status
        );
    }

    Ok(())
}
