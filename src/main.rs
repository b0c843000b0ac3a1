use clap::Parser;
use env_logger::Env;

mod api;
mod cli;
mod config;
mod storage;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = cli::Cli::parse();
    let cfg = config::Config::try_load_from_file_or_default(args.config.as_deref())?;
    cli::run(args, cfg).await
}
