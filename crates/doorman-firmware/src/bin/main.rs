#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use doorman_core::app_state::{AppError, AppRunState, AppState, display_message};
use doorman_core::client::AccessClient;
use doorman_core::feedback::Indicator;
use doorman_core::reader::{Mfrc522, ReaderError};
use doorman_core::terminal::{AccessTerminal, TerminalIdentity};
use doorman_firmware::net::TcpConnector;
use doorman_firmware::wifi::{self, WifiLink};
use doorman_firmware::{secrets, sntp};
use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Delay, Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::spi::Mode;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use log::{error, info, warn};
use static_cell::StaticCell;

/// MFRC522 modules are happy up to 10 MHz; stay well below for long wires.
const READER_SPI_MHZ: u32 = 4;
const READER_RETRY: Duration = Duration::from_secs(2);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let config = secrets::config();
    let mut state = AppState::new();

    let endpoint = match config.endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            let err = state.fail(AppError::Config(display_message(e)));
            panic!("{}", err);
        }
    };

    // RFID reader on SPI2
    let spi_bus = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(READER_SPI_MHZ))
            .with_mode(Mode::_0),
    )
    .expect("Failed to configure SPI2")
    .with_sck(peripherals.GPIO12)
    .with_mosi(peripherals.GPIO11)
    .with_miso(peripherals.GPIO13)
    .into_async();
    let cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to create SPI device");

    let mut reader = Mfrc522::new(spi_device, Delay);
    loop {
        match reader.init().await {
            Ok(_) => break,
            Err(e) => {
                let err = AppError::Reader(display_message(ReaderError::from(e)));
                error!("{}", err);
                Timer::after(READER_RETRY).await;
            }
        }
    }

    // Status LED and buzzer
    let led = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());
    let buzzer = Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default());
    let indicator = Indicator::new(led, buzzer, Delay).expect("Failed to drive feedback pins");

    // Wi-Fi station and network stack
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

    static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    spawner.spawn(net_task(runner).expect("Failed to spawn net task"));
    spawner.spawn(
        wifi::connection_task(controller, config.internet.ssid, config.internet.password)
            .expect("Failed to spawn Wi-Fi task"),
    );

    state.transition(AppRunState::WifiConnecting);
    wifi::wait_for_link(stack).await;
    state.transition(AppRunState::WifiConnected);

    state.transition(AppRunState::TimeSyncing);
    let clock = sntp::wait_for_time(stack).await;
    state.transition(AppRunState::TimeKnown);

    let mut client = AccessClient::new(TcpConnector::new(stack), endpoint);
    info!("Server: http://{}", client.endpoint());
    match client.server_info().await {
        Ok(server) => info!("Server test: {}", server.message),
        Err(e) => warn!("Server test failed: {}", e),
    }

    let mut terminal = AccessTerminal::new(
        reader,
        client,
        indicator,
        WifiLink::new(stack),
        clock,
        Delay,
        TerminalIdentity::from(&config.terminal),
    );

    state.transition(AppRunState::Polling);
    terminal.run().await
}
