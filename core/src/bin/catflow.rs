//! catflow command-line interface
//!
//! Type checks, inspects and dry-runs workflow programs. Exit codes:
//! 0 success, 1 config or I/O error, 2 parse error, 3 type error,
//! 4 execution error, 5 runtime type violation.

use catflow_core::cli;

#[tokio::main]
async fn main() {
    let code = cli::run_cli().await;
    std::process::exit(code);
}
