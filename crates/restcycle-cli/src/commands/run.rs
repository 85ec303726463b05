use std::sync::Arc;

use clap::Args;
use restcycle_core::events::Event;
use restcycle_core::storage::data_dir;
use restcycle_core::{
    BreakCycle, Command, Config, CycleDriver, DriverHandle, JsonSnapshotStore, PauseArbiter,
    SnapshotStore,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::console::{self, ConsoleEffects};
use super::input::{parse_line, Input, HELP};
use super::status::describe;

/// Completed and skipped breaks, one JSON object per line, in the data dir.
pub const ADHERENCE_LOG: &str = "adherence.jsonl";

#[derive(Args)]
pub struct RunArgs {
    /// Ignore any persisted cycle and start over
    #[arg(long)]
    pub fresh: bool,
    /// Wait for `start` instead of starting immediately
    #[arg(long)]
    pub idle: bool,
    /// Also print every cycle event as a JSON line
    #[arg(long)]
    pub events: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_console(args));
    // A pending stdin read cannot be cancelled; don't wait for it.
    runtime.shutdown_background();
    result
}

fn build_cycle(
    config: &Config,
    store: Arc<JsonSnapshotStore>,
    console: ConsoleEffects,
) -> BreakCycle {
    let mut cycle =
        BreakCycle::with_effects(config.cycle_configuration(), console.collaborators(store));
    if config.work_hours.enabled {
        cycle.set_schedule(Arc::new(config.work_hours.clone()));
    }
    cycle
}

/// Pick up a persisted cycle if there is one that still fits.
fn restore(cycle: &mut BreakCycle, store: &JsonSnapshotStore, fresh: bool) -> bool {
    if fresh {
        if let Err(e) = store.clear() {
            warn!("failed to clear cycle snapshot: {}", e);
        }
        return false;
    }
    match store.load() {
        Ok(Some(snapshot)) => cycle.recover(snapshot),
        Ok(None) => false,
        Err(e) => {
            warn!("ignoring unreadable cycle snapshot: {}", e);
            false
        }
    }
}

async fn print_events(handle: DriverHandle) {
    let mut events = handle.subscribe();
    drop(handle);
    loop {
        match events.recv().await {
            Ok(Event::StateChanged { .. }) => {}
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("failed to encode event: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn reload(handle: &DriverHandle) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    handle.send(Command::Policy(config.arbiter_policy())).await?;
    handle
        .send(Command::Configure(config.cycle_configuration()))
        .await?;
    println!("configuration reloaded");
    Ok(())
}

async fn run_console(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let dir = data_dir()?;
    let store = Arc::new(JsonSnapshotStore::new(dir.join(JsonSnapshotStore::FILE_NAME)));

    let (console, notices) = ConsoleEffects::new();
    let notices_task = tokio::spawn(console::dispatch(notices, dir.join(ADHERENCE_LOG)));

    let mut cycle = build_cycle(&config, store.clone(), console);
    if restore(&mut cycle, &store, args.fresh) {
        info!(
            state = %cycle.state(),
            remaining = cycle.remaining_secs(),
            "continuing previous cycle"
        );
    } else if !args.idle {
        let _ = cycle.start();
    }

    let (driver, handle) = CycleDriver::new(cycle, PauseArbiter::new(config.arbiter_policy()));
    if args.events {
        tokio::spawn(print_events(handle.clone()));
    }
    let driver_task = tokio::spawn(driver.run());

    println!("restcycle running, type 'help' for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_line(&line) {
                    Ok(Input::Send(Command::Shutdown)) => break,
                    Ok(Input::Send(command)) => handle.send(command).await?,
                    Ok(Input::Status) => println!("{}", describe(&handle.snapshot().await?)),
                    Ok(Input::Reload) => {
                        if let Err(e) = reload(&handle).await {
                            eprintln!("reload failed: {e}");
                        }
                    }
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Empty) => {}
                    Err(message) => eprintln!("{message}"),
                },
                // Input closed; keep running until interrupted.
                None => stdin_open = false,
            },
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    handle.shutdown().await?;
    let cycle = driver_task.await?;
    info!(state = %cycle.state(), "leaving, cycle kept for the next run");
    // Dropping the machine drops the console senders, which ends the dispatcher.
    drop(cycle);
    drop(handle);
    notices_task.await?;
    Ok(())
}
