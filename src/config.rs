use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub gateway_url: String,
    pub secrets_path: PathBuf,
    pub connection_retries: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        let debug = cfg!(debug_assertions);
        let gateway_url = env::var("TELEGRAM_GATEWAY_URL").unwrap_or_else(|_| {
            if debug {
                "http://127.0.0.1:8089/v1".to_string()
            } else {
                DEFAULT_GATEWAY_URL.to_string()
            }
        });
        let gateway_url = gateway_url.trim_end_matches('/').to_string();

        let data_dir = env::var("TELEGRAM_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir(debug));
        let secrets_path = env::var("TELEGRAM_SECRETS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("secrets.json"));

        let connection_retries = env_number("TELEGRAM_CONNECTION_RETRIES").unwrap_or(5);
        let request_timeout_secs = env_number("TELEGRAM_REQUEST_TIMEOUT_SECS").unwrap_or(30);

        Self {
            gateway_url,
            secrets_path,
            connection_retries,
            request_timeout_secs,
        }
    }
}

const DEFAULT_GATEWAY_URL: &str = "https://gateway.telegram-cli.dev/v1";

fn env_number<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn default_data_dir(debug: bool) -> PathBuf {
    let base = env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let dir_name = if debug { "telegram-cli-dev" } else { "telegram-cli" };
    base.join(".local").join("share").join(dir_name)
}
