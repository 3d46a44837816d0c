//! # Example: Ping Pong
//!
//! One epic answers every `PING` with a `PONG` after a short delay. A
//! `LogWriter` subscriber prints lifecycle events through `tracing`.
//!
//! ```text
//! dispatch(Ping) ─► reducer ─► epic ─► sleep 50ms ─► dispatch(Pong) ─► reducer
//! ```
//!
//! Run with: `RUST_LOG=debug cargo run --example ping_pong`

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use epicflow::{emit, Action, EpicFn, EpicMiddleware, EpicRef, LogWriter, Store};

#[derive(Debug, Clone, PartialEq)]
enum Msg {
    Ping(u32),
    Pong(u32),
}

impl Action for Msg {
    fn action_type(&self) -> &str {
        match self {
            Msg::Ping(_) => "PING",
            Msg::Pong(_) => "PONG",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Game {
    pings: u32,
    pongs: u32,
}

fn reduce(game: &mut Game, msg: &Msg) {
    match msg {
        Msg::Ping(_) => game.pings += 1,
        Msg::Pong(_) => game.pongs += 1,
    }
}

fn ping_pong() -> EpicRef<Msg, Game> {
    EpicFn::arc("ping_pong", |actions, _state, _deps| {
        Ok(emit(actions.of_type(["PING"]).subscribe().then(|ping| async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            match ping {
                Msg::Ping(n) => Msg::Pong(n),
                other => other,
            }
        })))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mw = EpicMiddleware::builder(())
        .with_subscribers(vec![Arc::new(LogWriter::new())])
        .with_root_epic(ping_pong())
        .build();
    let store = Store::with_middleware(reduce, Game::default(), vec![Arc::new(mw.clone())])?;

    for n in 1..=3 {
        store.dispatch(Msg::Ping(n));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let game = store.get_state();
    println!("pings={} pongs={} status={:?}", game.pings, game.pongs, mw.status());
    Ok(())
}
