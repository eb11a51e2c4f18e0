const CONFIG_KEYS: [&str; 5] = [
    "DOORMAN_WIFI_SSID",
    "DOORMAN_WIFI_PASSWORD",
    "DOORMAN_SERVER_URL",
    "DOORMAN_ACCESS_POINT",
    "DOORMAN_ACCESS_TYPE",
];

fn main() {
    println!("cargo:rustc-link-arg=-Tlinkall.x");

    // Values from the process environment win over the .env file.
    println!("cargo:rerun-if-changed=.env");
    let _ = dotenvy::dotenv();

    for key in CONFIG_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_default();
        println!("cargo:rustc-env={key}={value}");
    }
}
