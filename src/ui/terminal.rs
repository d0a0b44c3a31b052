use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;

use crate::models::SessionState;
use crate::supervisor::{ConfirmRequest, SessionHandle, SessionObserver, SessionSupervisor};

/// Everything the front-end loop reacts to.
#[derive(Debug)]
pub enum UiEvent {
    Status(String),
    Title(String),
    PlayEnabled(bool),
    Confirm(ConfirmRequest),
    State(SessionState),
    Input(String),
    InputClosed,
    Interrupted,
}

/// Forwards session updates to the front-end loop.
pub struct TerminalObserver {
    tx: Sender<UiEvent>,
}

impl TerminalObserver {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: UiEvent) {
        // The loop is gone once the front-end has exited; nothing to report to
        let _ = self.tx.send(event);
    }
}

impl SessionObserver for TerminalObserver {
    fn set_status(&self, text: &str) {
        self.send(UiEvent::Status(text.to_string()));
    }

    fn set_title(&self, title: &str) {
        self.send(UiEvent::Title(title.to_string()));
    }

    fn set_play_enabled(&self, enabled: bool) {
        self.send(UiEvent::PlayEnabled(enabled));
    }

    fn request_confirmation(&self, request: ConfirmRequest) {
        self.send(UiEvent::Confirm(request));
    }

    fn state_changed(&self, state: SessionState) {
        self.send(UiEvent::State(state));
    }
}

/// A line typed while a session is playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Stop,
    Divisions(u32),
    Url(String),
    ShowState,
    Help,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Option<UiCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word, rest) {
        ("q" | "quit" | "stop", "") => UiCommand::Stop,
        ("s" | "state" | "status", "") => UiCommand::ShowState,
        ("h" | "help" | "?", "") => UiCommand::Help,
        ("d" | "divisions", value) if !value.is_empty() => match value.parse() {
            Ok(divisions) => UiCommand::Divisions(divisions),
            Err(_) => UiCommand::Unknown(line.to_string()),
        },
        ("u" | "url", value) if !value.is_empty() => UiCommand::Url(value.to_string()),
        _ => UiCommand::Unknown(line.to_string()),
    };
    Some(command)
}

/// Interpret an answer to the restart question. Empty means yes.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Read stdin lines into the event channel on a background thread.
pub fn spawn_stdin_reader(tx: Sender<UiEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("videotiler-stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(UiEvent::Input(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(UiEvent::InputClosed);
        })?;
    Ok(())
}

fn print_status(text: &str) {
    let line = if text.starts_with("Error") {
        text.red().bold()
    } else if text.starts_with("Playing") {
        text.green().bold()
    } else if text.starts_with("Starting") {
        text.blue()
    } else {
        text.normal()
    };
    println!("{} {}", "→".cyan().bold(), line);
}

fn print_help() {
    println!("  {}         stop playback", "q".bold());
    println!("  {}       grid divisions for the next restart", "d N".bold());
    println!("  {}     stream URL for the next restart", "u URL".bold());
    println!("  {}         show session state", "s".bold());
}

fn prompt_confirmation(request: &ConfirmRequest) {
    print!(
        "{} {}. Restart? [Y/n] (restarting in {}s) ",
        "?".yellow().bold(),
        request.reason(),
        request.remaining().as_secs()
    );
    let _ = io::stdout().flush();
}

/// Drive the terminal until the session ends.
pub fn run_front_end(supervisor: &SessionSupervisor, handle: &SessionHandle, events: Receiver<UiEvent>) {
    let mut pending: Option<ConfirmRequest> = None;

    loop {
        let event = match &pending {
            Some(request) => match events.recv_timeout(request.remaining()) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => {
                    println!();
                    println!("{} No answer, restarting", "→".cyan().bold());
                    pending = None;
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match events.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        match event {
            UiEvent::Status(text) => print_status(&text),
            UiEvent::Title(title) => println!("{} {}", "Title:".bold(), title),
            UiEvent::State(state) => tracing::debug!(%state, "front-end saw state change"),
            UiEvent::Confirm(request) => {
                prompt_confirmation(&request);
                pending = Some(request);
            }
            UiEvent::PlayEnabled(true) => {
                if handle.state().is_terminal() {
                    break;
                }
            }
            UiEvent::PlayEnabled(false) => {}
            UiEvent::Input(line) => {
                if let Some(request) = pending.take() {
                    match parse_answer(&line) {
                        Some(restart) => {
                            if !request.respond(restart) {
                                println!("{} Question already closed", "─".dimmed());
                            }
                        }
                        None => {
                            println!("Please answer y or n");
                            prompt_confirmation(&request);
                            pending = Some(request);
                        }
                    }
                    continue;
                }
                handle_command(handle, &line);
            }
            UiEvent::InputClosed => {
                tracing::debug!("stdin closed; use Ctrl-C to stop");
            }
            UiEvent::Interrupted => {
                println!();
                println!("{} Stopping...", "→".cyan().bold());
                handle.stop();
            }
        }
    }

    supervisor.wait();
}

fn handle_command(handle: &SessionHandle, line: &str) {
    let Some(command) = parse_command(line) else {
        return;
    };

    match command {
        UiCommand::Stop => handle.stop(),
        UiCommand::ShowState => {
            let request = handle.request();
            println!(
                "{} {} ({}, {}x{} grid)",
                "State:".bold(),
                handle.state(),
                request.url,
                request.divisions,
                request.divisions
            );
        }
        UiCommand::Divisions(divisions) => match handle.set_divisions(divisions) {
            Ok(()) => println!(
                "{} Divisions set to {divisions}, applied on next restart",
                "✓".green().bold()
            ),
            Err(e) => println!("{} {e}", "✗".red().bold()),
        },
        UiCommand::Url(url) => match handle.set_url(url.clone()) {
            Ok(()) => println!("{} URL set to {url}, applied on next restart", "✓".green().bold()),
            Err(e) => println!("{} {e}", "✗".red().bold()),
        },
        UiCommand::Help => print_help(),
        UiCommand::Unknown(text) => {
            println!("{} Unknown command: {text}", "✗".red().bold());
            print_help();
        }
    }
}

/// Channel pair used by `play`: observer and stdin reader feed the sender.
pub fn event_channel() -> (Sender<UiEvent>, Receiver<UiEvent>) {
    mpsc::channel()
}
