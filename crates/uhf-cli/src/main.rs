//! UHF bridge command-line tool.
//!
//! Drives a reader session against the mock driver and prints every
//! notification as one JSON line, followed by the structured result of each
//! operation.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uhf_core::constants::{
    DEFAULT_AUTO_RESET_TIMEOUT_MS, DEFAULT_BUFFER_CAPACITY, DEFAULT_POWER, DEFAULT_SIMULATED_KEY_CODE,
};
use uhf_hardware::mock::{MockUhfDriver, MockUhfHandle};
use uhf_reader::{
    OverflowPolicy, ReaderBridge, ReaderConfig, ReaderSession, SetPowerOptions,
    SimulateKeyOptions, StartFilteredOptions,
};

/// Time given to the event pump to drain injected reads.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "uhf-cli", version, about = "UHF RFID reader bridge tool")]
struct Cli {
    /// Radio power in dBm (5-30)
    #[arg(long, env = "UHF_POWER", default_value_t = DEFAULT_POWER)]
    power: u8,

    /// Inventory buffer capacity
    #[arg(long, env = "UHF_BUFFER_CAPACITY", default_value_t = DEFAULT_BUFFER_CAPACITY)]
    buffer_capacity: usize,

    /// Drop incoming reads instead of evicting the oldest when the buffer is full
    #[arg(long)]
    reject_new: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plain inventory: buffer every read, then drain the buffer
    Inventory {
        /// Tag EPCs the mock radio reports
        #[arg(long, value_delimiter = ',', default_values_t = default_tags())]
        tags: Vec<String>,
    },

    /// Filtered reading: report each target tag once
    Filtered {
        /// Target EPCs
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<String>,

        /// Tag EPCs the mock radio reports
        #[arg(long, value_delimiter = ',', default_values_t = default_tags())]
        tags: Vec<String>,
    },

    /// Trigger key: press and release, or hold until auto-reset
    Trigger {
        /// Key code to press
        #[arg(long, default_value_t = DEFAULT_SIMULATED_KEY_CODE)]
        key_code: u16,

        /// Hold the key this long without releasing it
        #[arg(long)]
        hold_ms: Option<u64>,

        /// Auto-reset timeout in milliseconds
        #[arg(long, default_value_t = DEFAULT_AUTO_RESET_TIMEOUT_MS)]
        auto_reset_ms: u64,
    },
}

fn default_tags() -> Vec<String> {
    ["E2000017221101441890AABB", "e2000017221101441890aabb", "E2000017221101441890CCDD"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn print_result(operation: &str, result: impl serde::Serialize) -> anyhow::Result<()> {
    let line = serde_json::to_string(&json!({ "operation": operation, "result": result }))
        .context("failed to serialize result")?;
    println!("{line}");
    Ok(())
}

async fn inject_tags(handle: &MockUhfHandle, tags: &[String]) -> anyhow::Result<()> {
    for (i, epc) in tags.iter().enumerate() {
        let rssi = format!("-{}", 50 + i % 20);
        handle
            .read_tag(epc, &rssi)
            .await
            .with_context(|| format!("failed to inject read {epc}"))?;
    }
    tokio::time::sleep(SETTLE_DELAY).await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ReaderConfig::default()
        .buffer_capacity(cli.buffer_capacity)
        .initial_power(cli.power);
    if cli.reject_new {
        config = config.overflow_policy(OverflowPolicy::RejectNew);
    }
    if let Commands::Trigger { auto_reset_ms, .. } = &cli.command {
        config = config.auto_reset_timeout(Duration::from_millis(*auto_reset_ms));
    }

    let (driver, handle) = MockUhfDriver::new();
    let session = ReaderSession::new(driver, config).context("invalid reader configuration")?;
    let bridge = ReaderBridge::new(session);

    let mut events = bridge.add_listener();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => debug!(error = %e, "failed to serialize event"),
                },
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let init = bridge.init_reader().await;
    let initialized = init.success;
    print_result("initReader", init)?;
    if !initialized {
        bail!("reader initialization failed");
    }
    print_result("getDeviceId", bridge.get_device_id().await)?;
    print_result(
        "setPower",
        bridge
            .set_power(SetPowerOptions {
                power: i64::from(cli.power),
            })
            .await,
    )?;

    match cli.command {
        Commands::Inventory { tags } => {
            print_result("startReading", bridge.start_reading().await)?;
            inject_tags(&handle, &tags).await?;
            print_result("getInventoryStatus", bridge.get_inventory_status())?;
            print_result("stopReading", bridge.stop_reading().await)?;

            loop {
                let reply = bridge.get_inventory_tag();
                let drained = reply.data.is_none();
                print_result("getInventoryTag", reply)?;
                if drained {
                    break;
                }
            }
        }
        Commands::Filtered { targets, tags } => {
            print_result(
                "startFilteredReading",
                bridge
                    .start_filtered_reading(StartFilteredOptions {
                        target_tags: targets,
                    })
                    .await,
            )?;
            inject_tags(&handle, &tags).await?;
            print_result(
                "getFilteredReadingStatus",
                bridge.get_filtered_reading_status(),
            )?;
            print_result("stopFilteredReading", bridge.stop_filtered_reading().await)?;
        }
        Commands::Trigger {
            key_code, hold_ms, ..
        } => match hold_ms {
            Some(hold_ms) => {
                handle
                    .press_key(key_code)
                    .await
                    .context("failed to inject key press")?;
                info!(key_code, hold_ms, "holding key");
                tokio::time::sleep(Duration::from_millis(hold_ms)).await;
                print_result("resetKeyState", bridge.reset_key_state())?;
            }
            None => {
                print_result(
                    "simulateKeyPress",
                    bridge.simulate_key_press(SimulateKeyOptions {
                        key_code: Some(key_code),
                    }),
                )?;
            }
        },
    }

    print_result("free", bridge.free().await)?;
    drop(bridge);
    printer.await.context("event printer task failed")?;
    Ok(())
}
