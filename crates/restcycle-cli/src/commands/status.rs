use clap::Args;
use restcycle_core::{CycleSnapshot, JsonSnapshotStore, SnapshotStore};

#[derive(Args)]
pub struct StatusArgs {
    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Human-readable multi-line summary.
pub fn describe(snapshot: &CycleSnapshot) -> String {
    let mut lines = vec![format!(
        "state:     {} {}",
        snapshot.state,
        clock(snapshot.remaining_secs)
    )];
    match &snapshot.pause {
        Some(pause) => {
            let reason = pause
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            lines.push(format!("paused:    by {}{reason}", pause.source));
        }
        None => lines.push("paused:    no".to_string()),
    }
    lines.push(format!("breaks:    {}", snapshot.break_count));
    lines.push(format!(
        "worked:    {} since last break",
        clock(snapshot.work_elapsed_secs)
    ));
    if snapshot.is_long_break() {
        lines.push("long break".to_string());
    }
    if snapshot.overtime_nudge_shown {
        lines.push("overtime nudge shown".to_string());
    }
    lines.join("\n")
}

pub fn run(args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonSnapshotStore::open_default()?;
    let snapshot = store.load()?;

    if args.json {
        match snapshot {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("{}", serde_json::json!({ "state": "idle" })),
        }
        return Ok(());
    }

    match snapshot {
        Some(snapshot) => println!("{}", describe(&snapshot)),
        None => println!("state:     idle"),
    }
    Ok(())
}
