use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use kannon_common::models::{ControlInput, Direction};
use kannon_core::actuators::sim::{SimRelayBoard, SimServoBoard};
use kannon_core::actuators::{FiringController, PanTiltController};
use kannon_core::eventbus::{EventBus, KannonEvent, PortKind};
use kannon_core::tasks::attach_watcher::spawn_attach_watcher;
use kannon_core::tasks::control_loop::spawn_control_loop;
use kannon_core::{ControlConfig, ControlService};
use kannon_common::traits::{RelayBoard, ServoBoard};

mod console;
use console::{parse_line, ConsoleCommand, HELP};

#[derive(Parser, Debug, Clone)]
#[command(name = "kannon")]
#[command(author, version, about = "Kannon - pan/tilt cannon control core on simulated boards")]
struct Args {
    /// JSON config file. Falls back to KANNON_CONFIG, then built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the velocity limit in degrees.
    #[arg(long)]
    speed_limit: Option<f64>,

    /// Start with both boards detached.
    #[arg(long, default_value = "false")]
    detached: bool,

    /// Capacity of the adapter input queue.
    #[arg(long, default_value = "64")]
    input_buffer: usize,
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("kannon=info".parse()?)
        .add_directive("kannon_core=info".parse()?);
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("Failed to set global subscriber")?;
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<ControlConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var("KANNON_CONFIG").ok().map(PathBuf::from));
    let mut config = match path {
        Some(p) => ControlConfig::load(&p)?,
        None => ControlConfig::default(),
    };
    if let Some(limit) = args.speed_limit {
        config.speed_limit = limit;
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;
    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        "Kannon starting. speed_limit={}, nudge_step={}, pulse={}ms",
        config.speed_limit, config.nudge_step, config.fire_pulse_ms
    );

    // 1) Boards and their controllers
    let servo_board = Arc::new(SimServoBoard::new());
    let relay_board = Arc::new(SimRelayBoard::new());
    let pan_tilt = Arc::new(PanTiltController::new(servo_board.clone(), &config));
    let firing = Arc::new(FiringController::new(relay_board.clone(), &config));
    if let Err(e) = pan_tilt.try_initialize().await {
        error!("{}", e);
    }
    if let Err(e) = firing.try_initialize().await {
        error!("{}", e);
    }

    // 2) Event bus and attach watchers
    let event_bus = Arc::new(EventBus::with_buffer(config.event_buffer));
    let mut watchers = vec![
        spawn_attach_watcher(PortKind::PanTilt, servo_board.attach_events(), pan_tilt.clone(), event_bus.clone()),
        spawn_attach_watcher(PortKind::Relay, relay_board.attach_events(), firing.clone(), event_bus.clone()),
    ];
    watchers.push(spawn_event_logger(event_bus.clone()));

    // 3) Control service and loop
    let service = Arc::new(ControlService::new(config, pan_tilt, firing, event_bus.clone()));
    let (input_tx, input_rx) = mpsc::channel::<ControlInput>(args.input_buffer.max(1));
    let control_loop = spawn_control_loop(service.clone(), input_rx);

    if !args.detached {
        servo_board.attach();
        relay_board.attach();
    }

    // 4) Console adapter
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            ConsoleCommand::Input(input) => {
                if input_tx.send(input).await.is_err() {
                    warn!("Control loop is gone, exiting");
                    break;
                }
            }
            ConsoleCommand::Status => {
                let status = service.status().await;
                println!("{} | {}", status.system_status(), status.arm_state.safety_text());
                let latched: Vec<String> = Direction::ALL
                    .iter()
                    .filter(|d| status.interlocks.get(**d))
                    .map(|d| format!("too far {}", d))
                    .collect();
                if !latched.is_empty() {
                    println!("Rage safety: {}", latched.join(", "));
                }
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            ConsoleCommand::Attach => {
                servo_board.attach();
                relay_board.attach();
            }
            ConsoleCommand::Detach => {
                servo_board.detach();
                relay_board.detach();
            }
            ConsoleCommand::CancelFire => {
                if service.cancel_fire().await.is_none() {
                    println!("No active pulse");
                }
            }
            ConsoleCommand::EmergencyStop => {
                if let Err(e) = service.emergency_stop().await {
                    error!("Emergency stop: {}", e);
                }
            }
            ConsoleCommand::Reinitialize => {
                if let Err(e) = service.reinitialize().await {
                    error!("Re-initialize failed: {}", e);
                }
            }
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => break,
            ConsoleCommand::Empty => {}
            ConsoleCommand::Unknown(msg) => println!("{}", msg),
        }
    }

    info!("Shutting down");
    event_bus.shutdown();
    drop(input_tx);
    control_loop.await?;
    for w in watchers {
        w.await?;
    }
    Ok(())
}

/// Logs bus traffic; stands in for the HUD and the beep/flash confirmation.
fn spawn_event_logger(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut rx = event_bus.subscribe(None);
    let mut shutdown_rx = event_bus.shutdown_rx.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    match event {
                        KannonEvent::SafetyToggled { state, .. } => {
                            info!("*beep* {}", state.safety_text());
                        }
                        KannonEvent::AxisHalted { axis, reason } => {
                            error!("{} axis halted: {}", axis, reason);
                        }
                        other => info!("[{}] {:?}", other.event_type(), other),
                    }
                }
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
