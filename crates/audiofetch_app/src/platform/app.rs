use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use audiofetch_core::{update, AppState, Millis, Msg};
use audiofetch_engine::{DurableStore, EngineHandle, FileStore};
use audiofetch_logging::{af_info, af_warn};
use chrono::Utc;

use super::effects::EffectRunner;
use super::persistence::{change_to_msg, restore_messages};
use super::ui::commands::{self, Command, HELP};
use super::ui::render::{self, Renderer};
use crate::config::ClientConfig;

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const STORE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Everything the message loop reacts to.
#[derive(Debug)]
pub enum Input {
    Msg(Msg),
    Show,
    Help,
    Quit,
}

fn now_millis() -> Millis {
    Millis::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

pub fn run_app(config: ClientConfig) -> anyhow::Result<()> {
    let store = Arc::new(
        FileStore::open(config.storage_dir.clone())
            .with_context(|| format!("opening storage {}", config.storage_dir.display()))?,
    );
    let engine = EngineHandle::new(config.api_settings(), config.download_dir.clone())
        .context("configuring server connection")?;

    let (input_tx, input_rx) = mpsc::channel::<Input>();

    for msg in restore_messages(store.as_ref()) {
        let _ = input_tx.send(Input::Msg(msg));
    }
    spawn_store_listener(&store, input_tx.clone());

    let runner = EffectRunner::new(engine, store.clone(), input_tx.clone());
    spawn_ticker(input_tx.clone());
    spawn_stdin_reader(input_tx);

    println!("audiofetch connected to {} (type help)", config.server_url);
    let mut state = AppState::new();
    let mut renderer = Renderer::new();
    while let Ok(input) = input_rx.recv() {
        match input {
            Input::Msg(msg) => {
                let (next, effects) = update(std::mem::take(&mut state), msg);
                state = next;
                runner.enqueue(effects);
                if state.consume_dirty() {
                    print_lines(renderer.diff(state.view()));
                }
            }
            Input::Show => print_lines(render::full(&state.view())),
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
        }
    }
    af_info!("Shutting down");
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    let mut out = io::stdout().lock();
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = out.flush();
}

fn spawn_ticker(input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        while input_tx
            .send(Input::Msg(Msg::Tick { now: now_millis() }))
            .is_ok()
        {
            thread::sleep(TICK_INTERVAL);
        }
    });
}

/// Forwards writes made by other client instances. Without a working
/// filesystem watcher the directory is polled instead.
fn spawn_store_listener(store: &Arc<FileStore>, input_tx: mpsc::Sender<Input>) {
    let changes = store.subscribe();
    let forward_tx = input_tx.clone();
    thread::spawn(move || {
        for change in changes {
            if let Some(msg) = change_to_msg(change) {
                if forward_tx.send(Input::Msg(msg)).is_err() {
                    break;
                }
            }
        }
    });

    if let Err(err) = store.watch() {
        af_warn!("Storage watcher unavailable ({err}); polling instead");
        let store = Arc::clone(store);
        thread::spawn(move || loop {
            thread::sleep(STORE_POLL_INTERVAL);
            if let Err(err) = store.refresh() {
                af_warn!("Storage refresh failed: {err}");
            }
            // Stop once the loop has gone away.
            if input_tx.send(Input::Msg(Msg::NoOp)).is_err() {
                break;
            }
        });
    }
}

fn spawn_stdin_reader(input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let input = match commands::parse(&line) {
                Ok(Some(Command::Send(msg))) => Input::Msg(msg),
                Ok(Some(Command::Show)) => Input::Show,
                Ok(Some(Command::Help)) => Input::Help,
                Ok(Some(Command::Quit)) => Input::Quit,
                Ok(None) => continue,
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            };
            if input_tx.send(input).is_err() {
                return;
            }
        }
        let _ = input_tx.send(Input::Quit);
    });
}
