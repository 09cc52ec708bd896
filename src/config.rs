//! Server configuration from flags and environment

use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "sketchroom")]
#[command(about = "Sketchroom server - real-time shared drawing rooms")]
#[command(version)]
pub struct Config {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seconds an empty room is kept before it is destroyed
    #[arg(long, default_value_t = 300)]
    pub room_grace_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.room_grace_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            room_grace_secs: 300,
        }
    }
}
