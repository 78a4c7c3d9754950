//! Command-line flags for `confsyncd`.
//!
//! Flags override the settings file field by field; a flag that is not
//! given leaves the loaded value alone.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;

/// Keeps one config file identical across a mesh of peers.
#[derive(Debug, Parser)]
#[command(name = "confsyncd")]
#[command(version)]
#[command(about = "Keeps one config file identical across a mesh of peers")]
pub struct Cli {
    /// Request endpoint of a running peer to join; empty starts a new mesh
    #[arg(short, long, value_name = "ADDR")]
    pub bootstrap: Option<String>,

    /// Config file to synchronize
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Port of the join request endpoint (0 lets the OS pick)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Port of the network publish endpoint (0 lets the OS pick)
    #[arg(long, value_name = "PORT")]
    pub pub_port: Option<u16>,

    /// Host the network endpoints listen on
    #[arg(long = "bind", value_name = "HOST")]
    pub bind_host: Option<String>,

    /// Host advertised to peers
    #[arg(long = "host", value_name = "HOST")]
    pub advertise_host: Option<String>,

    /// Unix socket carrying raw config bodies to local consumers
    #[arg(long, value_name = "PATH")]
    pub local_socket: Option<PathBuf>,

    /// Join every peer learned from the bootstrap reply
    #[arg(long)]
    pub transitive_join: bool,

    /// Daemon settings file (TOML)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write daily rotated log files to this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Applies every flag that was given on top of `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(bootstrap) = &self.bootstrap {
            let bootstrap = bootstrap.trim();
            settings.bootstrap = (!bootstrap.is_empty()).then(|| bootstrap.to_string());
        }
        if let Some(file) = &self.file {
            settings.file = file.clone();
        }
        if let Some(port) = self.port {
            settings.request_port = port;
        }
        if let Some(port) = self.pub_port {
            settings.publish_port = port;
        }
        if let Some(host) = &self.bind_host {
            settings.bind_host = host.clone();
        }
        if let Some(host) = &self.advertise_host {
            settings.advertise_host = host.clone();
        }
        if let Some(socket) = &self.local_socket {
            settings.local_socket = socket.clone();
        }
        if self.transitive_join {
            settings.transitive_join = true;
        }
        if let Some(dir) = &self.log_dir {
            settings.general.log_dir = Some(dir.clone());
        }
        settings.general.log_level = settings.general.log_level.raised(self.verbose);
    }
}
