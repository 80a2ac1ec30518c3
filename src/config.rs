/// file: src/config.rs
/// description: runtime configuration assembled from CLI arguments
use crate::cli::Args;
use anyhow::Result;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub channel: ChannelConfig,
    pub polling: PollingConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub api_base: Url,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub quiet: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let url = Url::parse(&args.url)?;

        // Url::join treats a base without a trailing slash as a file,
        // which would drop the last path segment of the API base.
        let mut api_base = args.api_base.clone();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        let api_base = Url::parse(&api_base)?;

        Ok(Config {
            channel: ChannelConfig {
                url,
                base_delay: Duration::from_millis(args.base_delay_ms),
                max_delay: Duration::from_millis(args.max_delay_ms),
                max_retries: args.max_retries,
            },
            polling: PollingConfig {
                api_base,
                interval: Duration::from_secs(args.poll_interval),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            logging: LoggingConfig { quiet: args.quiet },
        })
    }

    pub fn reconnect_policy(&self) -> crate::channel_state::ReconnectPolicy {
        crate::channel_state::ReconnectPolicy {
            base_delay: self.channel.base_delay,
            max_delay: self.channel.max_delay,
            max_retries: self.channel.max_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn api_base_gains_trailing_slash() {
        let args = Args::parse_from(["yumi-dashboard", "--api-base", "http://host:5000/api"]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.polling.api_base.as_str(), "http://host:5000/api/");
        assert_eq!(
            config.polling.api_base.join("stats").unwrap().as_str(),
            "http://host:5000/api/stats"
        );
    }
}
