//! Desktop simulator for the doorman RFID access terminal.
//!
//! Runs the real terminal loop against an access server from the host. Type a
//! card UID in hex (`0AB304FF`) and press enter to present it; end input
//! (Ctrl-D) to quit.
//!
//! | Variable               | Default                     |
//! |------------------------|-----------------------------|
//! | `DOORMAN_SERVER_URL`   | `http://192.168.100.4:3000` |
//! | `DOORMAN_ACCESS_POINT` | `Main Entrance`             |
//! | `DOORMAN_ACCESS_TYPE`  | `entry`                     |

use std::process::ExitCode;

use doorman_core::client::AccessClient;
use doorman_core::link::AlwaysUp;
use doorman_core::terminal::{AccessTerminal, TerminalIdentity};
use doorman_simulator::{
    ConsoleIndicator, ScriptedReader, Settings, StdConnector, StdDelay, SystemClock,
};
use embassy_futures::block_on;
use log::{error, info, warn};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env();
    let config = settings.config();

    let endpoint = match config.endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!("DOORMAN_SERVER_URL {:?}: {}", settings.server_url, e);
            return ExitCode::FAILURE;
        }
    };

    let mut client = AccessClient::new(StdConnector::default(), endpoint);
    info!("Server: http://{}", client.endpoint());
    match block_on(client.server_info()) {
        Ok(server) => info!("Server test: {}", server.message),
        Err(e) => warn!("Server test failed: {}", e),
    }

    let mut terminal = AccessTerminal::new(
        ScriptedReader::new(std::io::stdin().lock()),
        client,
        ConsoleIndicator::default(),
        AlwaysUp,
        SystemClock,
        StdDelay,
        TerminalIdentity::from(&config.terminal),
    );

    info!(
        "Ready at {} ({}), type a card UID and press enter",
        config.terminal.access_point, config.terminal.access_type
    );
    while !terminal.reader().is_exhausted() {
        block_on(terminal.poll_once());
    }

    let signals = terminal.feedback();
    info!(
        "Done: {} granted, {} denied",
        signals.granted, signals.denied
    );
    ExitCode::SUCCESS
}
