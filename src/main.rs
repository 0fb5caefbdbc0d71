use dotenv::dotenv;
use smashbot::infra::{
    ControllerSink, DefaultObserver, PipePad, SocketTransport, run_token, write_locations,
};
use smashbot::state::{LocationRegistry, TRACKED_PORTS};
use smashbot::{ControlLoop, RunConfig};
use std::process::{Child, Command};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smashbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn launch_dolphin(config: &RunConfig) -> Result<Option<Child>, Box<dyn std::error::Error>> {
    let Some(exe) = &config.dolphin_exe else {
        return Ok(None);
    };

    tracing::info!("Launching {}", exe.display());
    let child = Command::new(exe).arg("--user").arg(&config.dolphin_dir).spawn()?;
    Ok(Some(child))
}

fn stop_dolphin(child: Option<&mut Child>) {
    if let Some(child) = child {
        let _ = child.kill();
        let _ = child.wait();
    }
}

async fn open_pads(config: &RunConfig) -> Result<Vec<Box<dyn ControllerSink>>, Box<dyn std::error::Error>> {
    let pipes_dir = config.pipes_dir();
    tracing::info!("Creating pads at {}. Open Dolphin now.", pipes_dir.display());

    let mut pads: Vec<Box<dyn ControllerSink>> = Vec::new();
    for port in config.ports() {
        pads.push(Box::new(PipePad::open(&pipes_dir, port).await?));
    }
    Ok(pads)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = RunConfig::from_env()?;
    config.validate()?;
    tracing::info!(
        "Agent {:?} on port(s) {:?}, acting every {} frame(s)",
        config.agent,
        config.ports(),
        config.act_every
    );

    let registry = LocationRegistry::new(&TRACKED_PORTS);
    write_locations(&config.dolphin_dir, &registry)?;
    let transport = SocketTransport::bind(config.memory_watcher_socket())?;

    let mut child = launch_dolphin(&config)?;

    let pads = tokio::select! {
        pads = open_pads(&config) => pads,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Pipes not initialized!");
            stop_dolphin(child.as_mut());
            // The blocking pipe open cannot be cancelled, so do not wait for the runtime
            std::process::exit(130);
        }
    };
    let pads = match pads {
        Ok(pads) => pads,
        Err(e) => {
            stop_dolphin(child.as_mut());
            return Err(e);
        }
    };

    let (handle, token) = run_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            handle.cancel();
        }
    });

    let mut control = match ControlLoop::new(&config, registry, transport, pads, DefaultObserver) {
        Ok(control) => control,
        Err(e) => {
            stop_dolphin(child.as_mut());
            return Err(e.into());
        }
    };
    control.run(token, child).await?;

    Ok(())
}
