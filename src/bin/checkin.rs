//! checkin - door-side ticket scanner
//!
//! This binary:
//! 1. Loads scanner configuration (file + environment, then CLI flags)
//! 2. Opens the configured camera and the detector backends compiled in
//! 3. Runs the scan → verify → cooldown loop, rendering status and results
//! 4. Accepts start/stop/quit commands on stdin (`--interactive`) or starts
//!    immediately; Ctrl-C stops the session and exits

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use checkin_scanner::capture::open_camera;
use checkin_scanner::ui::{TerminalSink, UiMode};
use checkin_scanner::{
    BackendRegistry, Command, CredentialStore, DriverParts, FileCredentialStore, HttpVerifier,
    PacedScheduler, ScanDriver, ScannerConfig, StaticCredential, SystemClock, ThreadSpawner,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scan and verify tickets at the door")]
struct Args {
    /// Camera URL (stub://name?codes=A,B or http(s):// snapshot endpoint).
    #[arg(long)]
    camera: Option<String>,

    /// Backend API base URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token. Overrides the credential file.
    #[arg(long, env = "CHECKIN_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Check tickets without marking them used.
    #[arg(long)]
    lookup_only: bool,

    /// Output style: auto, plain, or pretty.
    #[arg(long, default_value = "auto")]
    ui: String,

    /// Read start/stop/quit commands from stdin instead of starting at once.
    #[arg(long)]
    interactive: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = ScannerConfig::load()?;
    if let Some(camera) = args.camera {
        cfg.camera.url = camera;
    }
    if let Some(api_url) = args.api_url {
        cfg.api_base_url = api_url;
    }
    if args.lookup_only {
        cfg.scan.mark_used = false;
    }

    let credentials: Arc<dyn CredentialStore> = match args.token {
        Some(token) => Arc::new(StaticCredential::new(Some(token))),
        None => Arc::new(FileCredentialStore::new(
            cfg.credentials_path.clone(),
            cfg.credential_key.clone(),
        )),
    };
    let verifier = HttpVerifier::new(
        &cfg.api_base_url,
        &cfg.verify_path,
        cfg.request_timeout,
        credentials,
    )?;
    log::info!("verifying tickets at {}", verifier.endpoint());

    let registry = BackendRegistry::with_builtin_backends();
    log::info!("detector backends: {}", registry.list().join(", "));

    let is_tty = std::io::stderr().is_terminal();
    let disable_pretty = std::env::var_os("NO_COLOR").is_some();
    let sink = TerminalSink::new(UiMode::from_flag(Some(args.ui.as_str())), is_tty, disable_pretty);

    let mut driver = ScanDriver::new(DriverParts {
        camera: open_camera(&cfg.camera)?,
        capabilities: Box::new(registry),
        verifier: Arc::new(verifier),
        sink: Box::new(sink),
        spawner: Box::new(ThreadSpawner),
        clock: Arc::new(SystemClock),
        settings: cfg.scan.clone(),
    });

    let (commands_tx, commands_rx) = mpsc::channel();
    let ctrlc_tx = commands_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Command::Quit);
    })
    .map_err(|e| anyhow!("failed to install Ctrl-C handler: {}", e))?;

    if args.interactive {
        spawn_command_reader(commands_tx.clone())?;
        eprintln!("commands: start | stop | quit");
    } else {
        commands_tx
            .send(Command::Start)
            .map_err(|_| anyhow!("command channel closed"))?;
    }

    let mut scheduler = PacedScheduler::new(cfg.frame_interval());
    driver.run(&mut scheduler, &commands_rx);
    log::info!("checkin scanner exited");
    Ok(())
}

fn spawn_command_reader(commands: Sender<Command>) -> Result<()> {
    std::thread::Builder::new()
        .name("checkin-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let command = match line.trim().to_ascii_lowercase().as_str() {
                    "start" => Command::Start,
                    "stop" => Command::Stop,
                    "quit" | "exit" => Command::Quit,
                    "" => continue,
                    other => {
                        eprintln!("unknown command '{}'; expected start, stop or quit", other);
                        continue;
                    }
                };
                if commands.send(command).is_err() {
                    break;
                }
            }
            let _ = commands.send(Command::Quit);
        })
        .map(|_| ())
        .map_err(|e| anyhow!("failed to spawn command reader: {}", e))
}
