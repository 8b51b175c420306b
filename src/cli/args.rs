use crate::config::StoreConfig;
use crate::demo::{DemoRequest, DirectionConfig};
use crate::logging::LogFormat;
use crate::types::{AccountId, Currency, TransferError};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::time::Duration;

/// Run concurrent bidirectional transfers between two seeded accounts
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(
    about = "Run concurrent bidirectional transfers between two seeded accounts",
    long_about = None
)]
pub struct CliArgs {
    /// Transfers fired from the first account to the second
    #[arg(long = "a2b-count", value_name = "COUNT", default_value_t = 10)]
    pub a2b_count: u32,

    /// Amount of each first-to-second transfer
    #[arg(long = "a2b-amount", value_name = "AMOUNT", default_value = "1000")]
    pub a2b_amount: Decimal,

    /// Transfers fired from the second account to the first
    #[arg(long = "b2a-count", value_name = "COUNT", default_value_t = 10)]
    pub b2a_count: u32,

    /// Amount of each second-to-first transfer
    #[arg(long = "b2a-amount", value_name = "AMOUNT", default_value = "500")]
    pub b2a_amount: Decimal,

    /// Balance each demo account is topped up with before the run
    #[arg(long = "initial-balance", value_name = "AMOUNT", default_value = "100000")]
    pub initial_balance: Decimal,

    /// Currency of both demo accounts and every transfer
    #[arg(long = "currency", value_name = "CODE", default_value = "NGN")]
    pub currency: String,

    /// Report format written to stdout
    #[arg(long = "output", value_name = "FORMAT", default_value = "json")]
    pub output: OutputFormat,

    /// Log level for this crate (overridden by RUST_LOG)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log line format on stderr
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Tokio worker threads
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Tokio worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// Give up on a row lock after this many milliseconds
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MS",
        help = "Row lock wait timeout in milliseconds (default: wait forever)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// How often blocked lock waiters look for deadlocks
    #[arg(
        long = "deadlock-check-ms",
        value_name = "MS",
        help = "Deadlock detection interval in milliseconds (default: 20)"
    )]
    pub deadlock_check_ms: Option<u64>,

    /// Upper bound for list page sizes
    #[arg(
        long = "max-page-limit",
        value_name = "COUNT",
        help = "Maximum page size for list queries (default: 100)"
    )]
    pub max_page_limit: Option<usize>,
}

/// Report formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full demo report as JSON
    Json,
    /// Final account table followed by per-transfer outcomes
    Csv,
}

impl CliArgs {
    /// Create a StoreConfig from CLI arguments
    ///
    /// Flags that were not given use the defaults; invalid values fall back
    /// to the defaults with a warning.
    pub fn to_store_config(&self) -> StoreConfig {
        let default = StoreConfig::default();
        StoreConfig::new(
            self.max_page_limit.unwrap_or(default.max_page_limit),
            default.default_page_limit,
            self.deadlock_check_ms
                .map(Duration::from_millis)
                .unwrap_or(default.deadlock_check_interval),
            self.lock_timeout_ms.map(Duration::from_millis),
        )
    }

    /// Worker threads for the runtime; zero or absent means one per CPU core
    pub fn worker_threads(&self) -> usize {
        match self.workers {
            Some(workers) if workers > 0 => workers,
            _ => num_cpus::get(),
        }
    }

    /// Build the demo request for two seeded accounts
    pub fn to_demo_request(
        &self,
        source_account_id: AccountId,
        destination_account_id: AccountId,
    ) -> Result<DemoRequest, TransferError> {
        Ok(DemoRequest {
            source_account_id,
            destination_account_id,
            currency: Currency::new(self.currency.as_str())?,
            source_to_dest: DirectionConfig {
                count: self.a2b_count,
                amount_per_transfer: self.a2b_amount,
            },
            dest_to_source: DirectionConfig {
                count: self.b2a_count,
                amount_per_transfer: self.b2a_amount,
            },
        })
    }
}
