use clap::Parser;

use billsplit::api::cli::{Cli, run};
use billsplit::logging::{DEFAULT_FILTER, init_tracing};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_format, DEFAULT_FILTER) {
        eprintln!("Logging setup error: {e}");
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
