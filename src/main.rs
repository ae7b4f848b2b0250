// src/main.rs

use procmux::cli::{self, CliAction};
use procmux::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("procmux error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    match cli::parse() {
        CliAction::PrintVersion => {
            println!("{}", cli::version_string());
            Ok(())
        }
        CliAction::Run => run(std::io::stdin()).await,
    }
}
