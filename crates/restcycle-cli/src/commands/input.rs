//! Line-oriented control console.
//!
//! Each stdin line is one command. The same grammar is used by
//! `simulate --at TICK=COMMAND`.

use restcycle_core::{Command, IdleSignal, PowerEvent, SmartPauseSignal, WorkHoursSignal};

pub const DEFAULT_POSTPONE_MINUTES: u64 = 5;

pub const HELP: &str = "\
commands:
  start | stop | pause | resume | toggle | reset
  skip              skip ahead (respects skip difficulty)
  skip!             skip ahead regardless of difficulty
  postpone [MIN]    push the break back (default 5 minutes)
  idle SECS         report the user inactive for SECS
  back SECS         report the user returned after SECS away
  meeting [WHAT]    smart pause on (meeting, fullscreen, ...)
  meeting end       smart pause off
  offhours [WHY]    outside work hours
  onhours           back inside work hours
  sleep | wake      system power events
  status            print the current state
  reload            re-read the configuration file
  help              this text
  quit              leave (the cycle is kept for the next run)";

#[derive(Debug)]
pub enum Input {
    Send(Command),
    Status,
    Reload,
    Help,
    Empty,
}

fn seconds(arg: Option<&str>, what: &str) -> Result<u64, String> {
    let raw = arg.ok_or_else(|| format!("{what} needs a number of seconds"))?;
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a number of seconds"))
}

fn rest(words: &[&str]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

pub fn parse_line(line: &str) -> Result<Input, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(Input::Empty);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "toggle" | "t" => Command::Toggle,
        "reset" => Command::Reset,
        "skip" => Command::Skip {
            enforce_difficulty: true,
        },
        "skip!" => Command::Skip {
            enforce_difficulty: false,
        },
        "postpone" => {
            let minutes = match args.first() {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| format!("'{raw}' is not a number of minutes"))?,
                None => DEFAULT_POSTPONE_MINUTES,
            };
            Command::Postpone { minutes }
        }
        "idle" => Command::Idle(IdleSignal::idle(seconds(args.first().copied(), "idle")?)),
        "back" => Command::Idle(IdleSignal::returned(seconds(args.first().copied(), "back")?)),
        "meeting" => match args {
            ["end"] | ["off"] => Command::SmartPause(SmartPauseSignal::cleared()),
            _ => Command::SmartPause(SmartPauseSignal::active(
                rest(args).unwrap_or_else(|| "meeting".to_string()),
            )),
        },
        "offhours" => Command::WorkHours(WorkHoursSignal {
            should_pause: true,
            reason: Some(rest(args).unwrap_or_else(|| "outside work hours".to_string())),
        }),
        "onhours" => Command::WorkHours(WorkHoursSignal::default()),
        "sleep" => Command::Power(PowerEvent::Sleep),
        "wake" => Command::Power(PowerEvent::Wake),
        "status" => return Ok(Input::Status),
        "reload" => return Ok(Input::Reload),
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" | "q" => Command::Shutdown,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Input::Send(command))
}
