//! Command-line interface (CLI)
//!
//! `mqscope [<port>] [<interface>]`. Anything else comes from the
//! configuration file or `MQSCOPE_*` environment variables.
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mqscope",
    version,
    about = "Live MQTT 3.1.1 packet decoder (needs privileges to run the capture tool)"
)]
pub struct Cli {
    /// Broker TCP port to watch [default: 1883]
    pub port: Option<u16>,

    /// Interface to capture on [default: any]
    pub interface: Option<String>,
}
