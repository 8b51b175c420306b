//! Transfer Engine CLI
//!
//! Seeds two demo accounts, fires concurrent transfers between them in both
//! directions, verifies conservation and ledger reconciliation, and prints
//! the report.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --a2b-count 100 --b2a-count 100 --a2b-amount 250 --b2a-amount 250
//! cargo run -- --output csv > accounts.csv
//! RUST_LOG=transfer_engine=debug cargo run -- --log-format json
//! ```
//!
//! The report goes to stdout; logs go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (invalid arguments, failed invariant check, write failure, etc.)

use std::process;
use transfer_engine::{cli, logging, runner};

fn main() {
    let args = cli::parse_args();

    if let Err(e) = logging::init_logging(&args.log_level, args.log_format) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    if let Err(e) = runtime.block_on(runner::run(&args, &mut output)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
