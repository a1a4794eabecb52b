use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{ArgGroup, Parser};
use rdkafka::ClientConfig;

use crate::constants::{
    DEFAULT_HTTP_HOST, DEFAULT_HTTP_PORT, DEFAULT_READ_INTERVAL_SECS, DEFAULT_STATSD_ADDR, DEFAULT_STATSD_PREFIX,
};

/// Command Line Interface, defined via the declarative,
/// `derive` based functionality of the `clap` crate.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("logging_flags")
        .required(false)
        .multiple(false)
        .args(["verbose", "quiet"]),
))]
pub struct Cli {
    // ------------------------------------------------------------------ Kafka Client configuration
    /// Initial Kafka Brokers to connect to (format: 'HOST:PORT').
    ///
    /// Equivalent to '--kafka-conf=bootstrap.servers:host:port,...'.
    #[arg(value_name = "BROKERS", required = true, num_args = 1..)]
    pub brokers: Vec<String>,

    /// Client identifier used by the internal Kafka Clients.
    ///
    /// Equivalent to '--kafka-conf=client.id:my-client-id'.
    #[arg(long = "client-id", value_name = "CLIENT_ID", default_value = env!("CARGO_PKG_NAME"))]
    pub client_id: String,

    /// Additional configuration used by the internal Kafka Clients (format: 'CONF_KEY:CONF_VAL').
    ///
    /// To set multiple configurations keys, use this argument multiple times.
    /// See: https://github.com/edenhill/librdkafka/blob/master/CONFIGURATION.md.
    #[arg(
        long = "kafka-conf",
        value_name = "CONF_KEY:CONF_VAL",
        value_parser = kv_clap_value_parser,
        verbatim_doc_comment
    )]
    pub kafka_config: Vec<KVPair>,

    // ------------------------------------------------------------------------- Lag reporting
    /// StatsD server to send lag gauges to (format: 'HOST:PORT').
    #[arg(long = "statsd-addr", value_name = "HOST:PORT", default_value = DEFAULT_STATSD_ADDR)]
    pub statsd_addr: String,

    /// Prefix of every stat name sent to StatsD.
    ///
    /// Stat names are '<PREFIX>.group.<GROUP>.<TOPIC>.<PARTITION>'.
    #[arg(
        long = "statsd-prefix",
        value_name = "PREFIX",
        default_value = DEFAULT_STATSD_PREFIX,
        value_parser = prefix_clap_value_parser,
        verbatim_doc_comment
    )]
    pub statsd_prefix: String,

    /// How often (seconds) to poll latest offsets and report lag.
    #[arg(
        long = "read-interval",
        value_name = "SECONDS",
        default_value = DEFAULT_READ_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub read_interval_secs: u64,

    // ------------------------------------------------------------------------- HTTP
    /// Host address to listen on for HTTP requests.
    ///
    /// Supports both IPv4 and IPv6 addresses.
    #[arg(long, default_value = DEFAULT_HTTP_HOST, verbatim_doc_comment)]
    pub host: IpAddr,

    /// Port to listen on for HTTP requests.
    #[arg(long, default_value = DEFAULT_HTTP_PORT, verbatim_doc_comment)]
    pub port: u16,

    /// Verbose logging.
    ///
    /// * none    = 'WARN'
    /// * '-v'    = 'INFO'
    /// * '-vv'   = 'DEBUG'
    /// * '-vvv'  = 'TRACE'
    ///
    /// Alternatively, set environment variable 'KQM_LOG=(ERROR|WARN|INFO|DEBUG|TRACE|OFF)'.
    #[arg(short, long, action = clap::ArgAction::Count, verbatim_doc_comment)]
    pub verbose: u8,

    /// Quiet logging.
    ///
    /// * none    = 'WARN'
    /// * '-q'    = 'ERROR'
    /// * '-qq'   = 'OFF'
    ///
    /// Alternatively, set environment variable 'KQM_LOG=(ERROR|WARN|INFO|DEBUG|TRACE|OFF)'.
    #[arg(short, long, action = clap::ArgAction::Count, verbatim_doc_comment)]
    pub quiet: u8,
}

impl Cli {
    pub fn parse_and_validate() -> Self {
        Self::parse()
    }

    pub fn verbosity_level(&self) -> i8 {
        self.verbose as i8 - self.quiet as i8
    }

    pub fn listen_on(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_secs(self.read_interval_secs)
    }

    pub fn build_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", self.brokers.join(",")).set("client.id", self.client_id.clone());
        for cfg in &self.kafka_config {
            config.set(cfg.0.clone(), cfg.1.clone());
        }

        trace!("Created:\n{:#?}", config);
        config
    }
}

/// A simple (key,value) pair of `String`s, useful to be parsed from arguments via [`kv_clap_value_parser`].
pub type KVPair = (String, String);

/// To be used as [`clap::value_parser`] function to create [`KVPair`] values.
fn kv_clap_value_parser(kv: &str) -> Result<KVPair, String> {
    let (k, v) = match kv.split_once(':') {
        None => {
            return Err("Should have 'K:V' format".to_string());
        },
        Some((k, v)) => (k, v),
    };

    Ok((k.to_string(), v.to_string()))
}

fn prefix_clap_value_parser(prefix: &str) -> Result<String, String> {
    if prefix.is_empty() {
        return Err("Prefix should not be empty".to_string());
    }

    Ok(prefix.to_string())
}
