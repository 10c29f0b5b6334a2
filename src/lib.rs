pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;
pub mod view;

pub use config::{AnswererConfig, NegotiatorConfig};
pub use error::{NegotiatorError, Result};
pub use session::Session;
pub use signaling::{HttpEndpoint, NegotiationEndpoint, StdinEndpoint};
pub use view::{ConsoleView, MemoryView, SessionView};

use cli::{Cli, Command, CommonArgs};
use peer::types::ServerConfig;
use tokio_util::sync::CancellationToken;

fn servers(common: &CommonArgs) -> Vec<ServerConfig> {
    common
        .ice_servers
        .iter()
        .map(|s| ServerConfig::parse(s))
        .collect()
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Call(args) => {
            let config = NegotiatorConfig {
                endpoint: args.endpoint,
                ice_servers: servers(&args.common),
                encoding: args.common.encoding,
                ..Default::default()
            };
            commands::run_call(commands::CallOptions {
                config,
                manual: false,
                display: args.capture.display,
                deny_camera: args.capture.no_camera,
            })
            .await
        }
        Command::Offer(args) => {
            let config = NegotiatorConfig {
                ice_servers: servers(&args.common),
                encoding: args.common.encoding,
                ..Default::default()
            };
            commands::run_call(commands::CallOptions {
                config,
                manual: true,
                display: args.capture.display,
                deny_camera: args.capture.no_camera,
            })
            .await
        }
        Command::Serve(args) => {
            let config = AnswererConfig {
                listen: args.listen,
                ice_servers: servers(&args.common),
                encoding: args.common.encoding,
                ..Default::default()
            };

            let shutdown = CancellationToken::new();
            let on_signal = shutdown.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                on_signal.cancel();
            });
            commands::serve(config, shutdown).await
        }
    }
}
