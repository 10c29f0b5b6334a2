use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    media_negotiator::logger::init();
    media_negotiator::run(media_negotiator::cli::Cli::parse()).await
}
