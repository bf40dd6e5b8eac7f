mod app;
mod cli;
mod env_cache;

use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; flags and the process environment still apply.
    let _ = dotenvy::dotenv();
    let args = cli::Args::parse();
    app::run(args).await
}
