//! REPL – Read-Eval-Print Loop for driving the rover interactively.
//!
//! Supported commands:
//!   left / right / forward / reverse / coast / center / stop – steer
//!   speed N       – set drive speed, 0..=4
//!   light         – toggle the attention light
//!   range         – request a forward-range reading now
//!   say TEXT      – send an info message to the robot
//!   state         – print the mirrored robot state
//!   help          – show this list
//!   quit | exit   – close the link and leave

use colored::Colorize;
use std::io::{self, BufRead, Write};

use roverlink_client::SessionHandle;
use roverlink_types::{RobotMessage, SteerMode};

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Steer(SteerMode),
    Speed(u8),
    Light,
    Range,
    Say(String),
    State,
    Help,
    Quit,
}

/// Parse a line of input. Returns `None` for blank or unrecognized lines.
pub fn parse(line: &str) -> Option<ReplCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut words = trimmed.split_whitespace();
    let head = words.next()?.to_lowercase();

    if let Some(mode) = SteerMode::from_token(&head) {
        return Some(ReplCommand::Steer(mode));
    }

    match head.as_str() {
        "speed" => {
            let n: u8 = words.next()?.parse().ok()?;
            Some(ReplCommand::Speed(n))
        }
        "light" => Some(ReplCommand::Light),
        "range" => Some(ReplCommand::Range),
        "say" => {
            let rest = trimmed["say".len()..].trim();
            if rest.is_empty() {
                None
            } else {
                Some(ReplCommand::Say(rest.to_string()))
            }
        }
        "state" => Some(ReplCommand::State),
        "help" | "?" => Some(ReplCommand::Help),
        "quit" | "exit" => Some(ReplCommand::Quit),
        _ => None,
    }
}

/// Run the blocking stdin loop until the user quits or the session dies.
pub fn run(handle: SessionHandle) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", "rover>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let cmd = match parse(&line) {
            Some(cmd) => cmd,
            None => {
                if !line.trim().is_empty() {
                    eprintln!("{}", "Unknown command. Type `help` for the list.".yellow());
                }
                continue;
            }
        };

        let result = match cmd {
            ReplCommand::Steer(mode) => handle.steer(mode),
            ReplCommand::Speed(n) => handle.set_speed(n),
            ReplCommand::Light => handle.toggle_attention_light(),
            ReplCommand::Range => handle.request_range(),
            ReplCommand::Say(text) => handle.send(RobotMessage::info(text), true),
            ReplCommand::State => {
                print_state(&handle);
                Ok(())
            }
            ReplCommand::Help => {
                print_help();
                Ok(())
            }
            ReplCommand::Quit => break,
        };

        if result.is_err() {
            eprintln!("{}", "Session is gone. Exiting.".red());
            break;
        }
    }
}

fn print_state(handle: &SessionHandle) {
    let state = handle.state();
    println!("  steer:     {}", state.steer);
    println!("  speed:     {}", state.speed);
    println!("  light:     {}", if state.attention_light { "on" } else { "off" });
    match state.forward_range_cm {
        Some(cm) => println!("  range:     {:.1} cm ({:?})", cm, state.zone),
        None => println!("  range:     (no reading yet)"),
    }
    println!("  connected: {}", state.connected);
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  left / right / forward / reverse / coast / center / stop");
    println!("  speed N       set drive speed, 0..=4");
    println!("  light         toggle the attention light");
    println!("  range         request a forward-range reading");
    println!("  say TEXT      send an info message to the robot");
    println!("  state         print the mirrored robot state");
    println!("  quit | exit   close the link and leave");
}
