use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{debug, info, warn};

use thermostat_common::{
    Actuator, ControlLoop, Error, InputEvent, Peripherals, RuntimeConfig, ThermostatState,
    TickReport,
};

use crate::sim::{LogDisplay, LogIndicator, SerialTransport, SimulatedSensor, SystemClock};

const CONFIG_ENV: &str = "THERMOSTAT_CONFIG";

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut runtime = load_runtime_config().unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let transport = match runtime.serial_path.as_deref() {
        Some(path) => SerialTransport::open(
            path,
            runtime.serial_baud,
            Duration::from_millis(runtime.serial_timeout_ms),
        )?,
        None => SerialTransport::stdout(),
    };

    let state = ThermostatState::new(&runtime.settings);
    let peripherals = Peripherals {
        sensor: SimulatedSensor::new(),
        display: LogDisplay::default(),
        heat: LogIndicator::new(Actuator::Heat),
        cool: LogIndicator::new(Actuator::Cool),
        transport,
    };
    let clock = SystemClock::new(resolve_timezone(&runtime.timezone));
    let mut control = ControlLoop::new(
        runtime.thermostat.clone(),
        state.clone(),
        peripherals,
        clock,
    );

    spawn_input_loop(state);
    let mut shutdown = spawn_shutdown_listener();

    if let Err(err) = control.start() {
        warn!("startup banner failed: {err}");
    }
    info!(
        "thermostat starting (tick {}ms, report every {}ms)",
        runtime.thermostat.tick_period_ms, runtime.thermostat.report_interval_ms
    );
    tokio::time::sleep(control.startup_pause()).await;

    loop {
        let report = control.tick();
        log_tick(&report);

        // Checked only between ticks so a tick always finishes its three steps.
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(control.tick_period()) => {}
        }
    }

    info!("shutting down");
    for err in control.begin_shutdown() {
        warn!("shutdown: {err}");
    }
    tokio::time::sleep(control.shutdown_pause()).await;
    for err in control.finish_shutdown() {
        warn!("shutdown: {err}");
    }
    info!("thermostat stopped ({})", control.phase().as_str());
    Ok(())
}

fn load_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(RuntimeConfig::default());
    };
    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read config {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse config {path}"))
}

fn resolve_timezone(name: &str) -> Option<Tz> {
    if name.is_empty() {
        return None;
    }
    match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(err) => {
            warn!("unknown timezone {name:?} ({err}); using system local time");
            None
        }
    }
}

fn parse_input(line: &str) -> Option<InputEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "m" | "mode" => Some(InputEvent::CycleMode),
        "+" | "up" => Some(InputEvent::Increase),
        "-" | "down" => Some(InputEvent::Decrease),
        _ => None,
    }
}

/// Stand-in for the three push buttons: one stdin line per press.
fn spawn_input_loop(state: ThermostatState) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(event) = parse_input(&line) {
                        let snapshot = state.apply(event);
                        info!(
                            "input {}: mode {} set point {:.0}F",
                            event.as_str(),
                            snapshot.mode,
                            snapshot.set_point_f
                        );
                    } else if !line.trim().is_empty() {
                        warn!("unknown input {line:?}; use m, + or -");
                    }
                }
                Ok(None) => {
                    info!("stdin closed; buttons disabled");
                    break;
                }
                Err(err) => {
                    warn!("stdin read error: {err}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });
}

fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(err) => {
                warn!("failed to listen for shutdown signal: {err}");
                // Keep the sender alive so the control loop never sees a closed channel.
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

fn log_tick(report: &TickReport) {
    for action in &report.actuations {
        info!("{} indicator -> {}", action.actuator, action.target.as_str());
    }
    if let Some(sent) = &report.sent {
        info!("status report sent: {}", sent.encode().trim_end());
    }
    for err in &report.errors {
        match err {
            Error::ActuatorFaulted(_) => debug!("tick: {err}"),
            _ => warn!("tick: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_button_lines() {
        assert_eq!(parse_input("m"), Some(InputEvent::CycleMode));
        assert_eq!(parse_input(" MODE \n"), Some(InputEvent::CycleMode));
        assert_eq!(parse_input("+"), Some(InputEvent::Increase));
        assert_eq!(parse_input("up"), Some(InputEvent::Increase));
        assert_eq!(parse_input("-"), Some(InputEvent::Decrease));
        assert_eq!(parse_input("down"), Some(InputEvent::Decrease));
        assert_eq!(parse_input("heat"), None);
    }

    #[test]
    fn empty_timezone_uses_local_time() {
        assert_eq!(resolve_timezone(""), None);
        assert_eq!(resolve_timezone("Not/AZone"), None);
        assert_eq!(
            resolve_timezone("America/Chicago"),
            Some(chrono_tz::America::Chicago)
        );
    }
}
