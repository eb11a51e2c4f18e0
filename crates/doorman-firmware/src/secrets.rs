//! Configuration baked in at build time from the environment or `.env`

use core::str::FromStr;

use doorman_core::api::AccessType;
use doorman_core::config::{
    Config, DEFAULT_ACCESS_POINT, DEFAULT_SERVER_URL, InternetConfig, ServerConfig,
    TerminalConfig,
};

const WIFI_SSID: &str = env!("DOORMAN_WIFI_SSID");
const WIFI_PASSWORD: &str = env!("DOORMAN_WIFI_PASSWORD");
const SERVER_URL: &str = env!("DOORMAN_SERVER_URL");
const ACCESS_POINT: &str = env!("DOORMAN_ACCESS_POINT");
const ACCESS_TYPE: &str = env!("DOORMAN_ACCESS_TYPE");

fn or_default(value: &'static str, default: &'static str) -> &'static str {
    if value.is_empty() { default } else { value }
}

pub fn config() -> Config<'static> {
    let access_type = AccessType::from_str(ACCESS_TYPE).unwrap_or_else(|_| {
        if !ACCESS_TYPE.is_empty() {
            log::warn!("Unknown access type {:?}, using entry", ACCESS_TYPE);
        }
        AccessType::Entry
    });

    Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        server: ServerConfig {
            base_url: or_default(SERVER_URL, DEFAULT_SERVER_URL),
        },
        terminal: TerminalConfig {
            access_point: or_default(ACCESS_POINT, DEFAULT_ACCESS_POINT),
            access_type,
        },
    }
}
