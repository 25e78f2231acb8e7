use clap::Parser;
use coursepay::application::ledger::OrderLedger;
use coursepay::application::payments::PaymentService;
use coursepay::config::ProviderArgs;
use coursepay::domain::ports::Stores;
use coursepay::gateway::Gateways;
use coursepay::interfaces::csv::coupon_reader::CouponReader;
use coursepay::interfaces::csv::course_reader::CourseReader;
use coursepay::interfaces::http::{self, AppState};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address the HTTP API listens on.
    #[arg(long, env = "COURSEPAY_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Course catalog CSV loaded at startup.
    #[arg(long)]
    courses: Option<PathBuf>,

    /// Coupon CSV loaded at startup.
    #[arg(long)]
    coupons: Option<PathBuf>,

    /// Load configuration and seed data, print a summary and exit.
    #[arg(long)]
    check_config: bool,

    #[command(flatten)]
    providers: ProviderArgs,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("COURSEPAY_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>) -> Result<(Stores, &'static str)> {
    use coursepay::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok((store.into_stores(), "rocksdb"))
        }
        None => Ok((Stores::in_memory(), "in-memory")),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>) -> Result<(Stores, &'static str)> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok((Stores::in_memory(), "in-memory"))
}

async fn seed_courses(stores: &Stores, path: &Path) -> Result<usize> {
    let file = File::open(path).into_diagnostic()?;
    let mut loaded = 0;
    for course in CourseReader::new(file).courses() {
        match course {
            Ok(course) => {
                stores.courses.store(course).await.into_diagnostic()?;
                loaded += 1;
            }
            Err(e) => eprintln!("Error reading course: {}", e),
        }
    }
    Ok(loaded)
}

async fn seed_coupons(ledger: &OrderLedger, path: &Path) -> Result<usize> {
    let file = File::open(path).into_diagnostic()?;
    let mut loaded = 0;
    for coupon in CouponReader::new(file).coupons() {
        match coupon {
            Ok(coupon) => match ledger.coupons().create_coupon(coupon).await {
                Ok(_) => loaded += 1,
                Err(e) => eprintln!("Error loading coupon: {}", e),
            },
            Err(e) => eprintln!("Error reading coupon: {}", e),
        }
    }
    Ok(loaded)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (stores, storage) = open_stores(cli.db_path.as_deref())?;
    let courses = match &cli.courses {
        Some(path) => seed_courses(&stores, path).await?,
        None => 0,
    };

    let ledger = Arc::new(OrderLedger::new(stores));
    let coupons = match &cli.coupons {
        Some(path) => seed_coupons(&ledger, path).await?,
        None => 0,
    };

    let gateways = Gateways::new(
        cli.providers.momo.clone().into(),
        cli.providers.zalopay.clone().into(),
        cli.providers.timeout(),
    )
    .into_diagnostic()?;
    let missing = cli.providers.missing_secrets();
    if !missing.is_empty() && !cli.check_config && !cli.providers.allow_missing_secrets {
        return Err(miette::miette!(
            help = "set them, or pass --allow-missing-provider-secrets for local runs",
            "Payment provider secrets are not set: {}",
            missing.join(", ")
        ));
    }
    if !missing.is_empty() {
        warn!(missing = %missing.join(", "), "Payment provider secrets are not set; provider callbacks will be rejected");
    }

    if cli.check_config {
        println!("storage: {}", storage);
        println!("courses loaded: {}", courses);
        println!("coupons loaded: {}", coupons);
        println!("bind: {}", cli.bind);
        println!("providers configured: {}", cli.providers.is_configured());
        return Ok(());
    }

    let payments = PaymentService::new(ledger.clone(), Arc::new(gateways));
    http::serve(AppState::new(ledger, payments), &cli.bind)
        .await
        .into_diagnostic()?;
    Ok(())
}
