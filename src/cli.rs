use crate::config::{DEFAULT_ENDPOINT, DEFAULT_LISTEN};
use crate::peer::codec::Encoding;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

#[derive(Debug, Parser)]
#[command(name = "media-negotiator", version, about = "Single-peer WebRTC offer/answer negotiator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Capture media, POST the offer to an endpoint and apply its answer
    Call(CallArgs),
    /// Same as `call`, but the answer is pasted manually
    Offer(OfferArgs),
    /// Run the answering endpoint (`POST /call`)
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct CommonArgs {
    /// ICE server, e.g. `stun:host:3478` or `turn:host:3478?user=u&credential=c`
    #[arg(long = "ice-server", env = "NEGOTIATOR_ICE_SERVERS", value_delimiter = ',')]
    pub ice_servers: Vec<String>,

    /// How session descriptions are packed before base64
    #[arg(long, value_enum, default_value_t = Encoding::Plain)]
    pub encoding: Encoding,
}

#[derive(Debug, Args)]
pub struct CaptureArgs {
    /// Also add a screen-capture track
    #[arg(long)]
    pub display: bool,

    /// Simulate a denied camera/microphone prompt
    #[arg(long)]
    pub no_camera: bool,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Negotiation endpoint URL
    #[arg(long, env = "NEGOTIATOR_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

#[derive(Debug, Args)]
pub struct OfferArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub capture: CaptureArgs,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Listen address
    #[arg(long, env = "NEGOTIATOR_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_servers() {
        let cli = Cli::try_parse_from([
            "media-negotiator",
            "call",
            "--ice-server",
            "stun:a:3478,turn:b:3478?user=u&credential=c",
            "--encoding",
            "gzip",
            "--display",
        ])
        .unwrap();
        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.common.ice_servers.len(), 2);
                assert_eq!(args.common.encoding, Encoding::Gzip);
                assert!(args.capture.display);
                assert_eq!(args.endpoint, DEFAULT_ENDPOINT);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_defaults_to_port_8888() {
        let cli = Cli::try_parse_from(["media-negotiator", "serve"]).unwrap();
        match cli.command {
            Command::Serve(args) => assert_eq!(args.listen.port(), 8888),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
