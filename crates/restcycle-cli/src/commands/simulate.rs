//! Deterministic replay: no clock, one heartbeat per loop iteration, and the
//! settle window closes right after the heartbeat that opened it.

use clap::Args;
use restcycle_core::driver::dispatch;
use restcycle_core::{BreakCycle, Config, CycleMode, Event, PauseArbiter};
use tokio::sync::broadcast;

use super::input::{parse_line, Input};

#[derive(Args)]
pub struct SimulateArgs {
    /// Work interval in seconds (default: from the config file)
    #[arg(long)]
    pub work: Option<u64>,
    /// Pre-break warning in seconds, 0 disables it
    #[arg(long)]
    pub pre_break: Option<u64>,
    /// Break length in seconds
    #[arg(long = "break")]
    pub break_secs: Option<u64>,
    /// Number of one-second heartbeats to replay
    #[arg(long, default_value_t = 60)]
    pub ticks: u32,
    /// Console command to issue after a heartbeat, e.g. `--at 5=pause`
    #[arg(long = "at", value_name = "TICK=COMMAND", value_parser = parse_scripted)]
    pub script: Vec<(u32, String)>,
    /// Include the state_changed snapshot after every transition
    #[arg(long)]
    pub states: bool,
    /// Do not start the cycle before the first heartbeat
    #[arg(long)]
    pub idle: bool,
}

fn parse_scripted(raw: &str) -> Result<(u32, String), String> {
    let (tick, line) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TICK=COMMAND, got '{raw}'"))?;
    let tick = tick
        .trim()
        .parse()
        .map_err(|_| format!("'{tick}' is not a tick number"))?;
    match parse_line(line)? {
        Input::Send(_) | Input::Status => Ok((tick, line.trim().to_string())),
        _ => Err(format!("'{line}' cannot be scripted")),
    }
}

/// Event as a JSON object tagged with the tick it happened on. The wall-clock
/// timestamp is dropped so replays are reproducible.
fn event_line(tick: u32, event: &Event) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(event)?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("at");
        obj.insert("tick".into(), tick.into());
    }
    serde_json::to_string(&value)
}

fn drain(
    tick: u32,
    events: &mut broadcast::Receiver<Event>,
    states: bool,
    out: &mut Vec<String>,
) -> serde_json::Result<()> {
    while let Ok(event) = events.try_recv() {
        if !states && matches!(event, Event::StateChanged { .. }) {
            continue;
        }
        out.push(event_line(tick, &event)?);
    }
    Ok(())
}

fn apply_script(
    tick: u32,
    script: &[(u32, String)],
    cycle: &mut BreakCycle,
    arbiter: &mut PauseArbiter,
    out: &mut Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    for (_, line) in script.iter().filter(|(at, _)| *at == tick) {
        match parse_line(line)? {
            Input::Send(command) => dispatch(cycle, arbiter, command),
            Input::Status => out.push(serde_json::to_string(&serde_json::json!({
                "type": "status",
                "tick": tick,
                "snapshot": cycle.snapshot(),
            }))?),
            Input::Reload | Input::Help | Input::Empty => {}
        }
    }
    Ok(())
}

/// Replay `args.ticks` heartbeats and return the output lines.
pub fn simulate(
    config: &Config,
    args: &SimulateArgs,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut configuration = config.cycle_configuration();
    if args.work.is_some() || args.pre_break.is_some() || args.break_secs.is_some() {
        configuration.mode = CycleMode::Custom;
    }
    if let Some(work) = args.work {
        configuration.work_interval_secs = work;
    }
    if let Some(pre_break) = args.pre_break {
        configuration.pre_break_secs = pre_break;
    }
    if let Some(break_secs) = args.break_secs {
        configuration.break_duration_secs = break_secs;
    }

    let mut cycle = BreakCycle::new(configuration);
    let mut arbiter = PauseArbiter::new(config.arbiter_policy());
    let mut events = cycle.subscribe();
    let mut out = Vec::new();

    if !args.idle {
        let _ = cycle.start();
    }
    apply_script(0, &args.script, &mut cycle, &mut arbiter, &mut out)?;
    drain(0, &mut events, args.states, &mut out)?;

    for tick in 1..=args.ticks {
        cycle.tick();
        cycle.finish_settle();
        apply_script(tick, &args.script, &mut cycle, &mut arbiter, &mut out)?;
        drain(tick, &mut events, args.states, &mut out)?;
    }
    Ok(out)
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    for line in simulate(&config, &args)? {
        println!("{line}");
    }
    Ok(())
}
