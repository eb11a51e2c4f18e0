//! Wi-Fi station management
//!
//! `connection_task` owns the radio controller. It connects at boot and keeps
//! retrying until the first association succeeds. After that a dropped link is
//! only re-established when the terminal asks for it through [`WifiLink`].

use core::sync::atomic::{AtomicBool, Ordering};

use doorman_core::app_state::{AppError, display_message};
use doorman_core::link::Link;
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{
    ClientConfig, ModeConfig, WifiController, WifiEvent, WifiStaState, sta_state,
};
use log::{error, info, warn};

/// Back-off between failed connection attempts before the first association
const BOOT_RETRY_DELAY: Duration = Duration::from_millis(5000);
/// Poll interval while waiting for the first association
const BOOT_POLL_INTERVAL: Duration = Duration::from_millis(500);

static ASSOCIATED: AtomicBool = AtomicBool::new(false);
static RECONNECT: Signal<CriticalSectionRawMutex, ()> = Signal::new();

fn report(detail: core::fmt::Arguments<'_>) {
    error!("{}", AppError::Wifi(display_message(detail)));
}

#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    let mut connected_once = false;

    loop {
        if matches!(sta_state(), WifiStaState::Connected) {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            ASSOCIATED.store(false, Ordering::Release);
            warn!("WiFi disconnected");
        }

        if connected_once {
            RECONNECT.wait().await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let mode = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(ssid.into())
                    .with_password(password.into()),
            );
            if let Err(e) = controller.set_config(&mode) {
                report(format_args!("station config rejected: {:?}", e));
                Timer::after(BOOT_RETRY_DELAY).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                report(format_args!("start failed: {:?}", e));
                Timer::after(BOOT_RETRY_DELAY).await;
                continue;
            }
        }

        info!("Connecting to WiFi: {}", ssid);
        match controller.connect_async().await {
            Ok(()) => {
                info!("WiFi connected");
                ASSOCIATED.store(true, Ordering::Release);
                connected_once = true;
            }
            Err(e) => {
                report(format_args!("{:?}", e));
                if !connected_once {
                    Timer::after(BOOT_RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Block until the station is associated and DHCP has handed out an address.
pub async fn wait_for_link(stack: Stack<'static>) {
    while !ASSOCIATED.load(Ordering::Acquire) {
        Timer::after(BOOT_POLL_INTERVAL).await;
    }
    stack.wait_config_up().await;

    if let Some(config) = stack.config_v4() {
        info!("IP address: {}", config.address.address());
    }
}

/// Link handle for the terminal loop
#[derive(Clone, Copy)]
pub struct WifiLink {
    stack: Stack<'static>,
}

impl WifiLink {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl Link for WifiLink {
    fn is_up(&self) -> bool {
        ASSOCIATED.load(Ordering::Acquire) && self.stack.is_config_up()
    }

    fn begin_reconnect(&mut self) {
        RECONNECT.signal(());
    }
}
