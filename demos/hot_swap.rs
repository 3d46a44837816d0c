//! # Example: Hot Swap
//!
//! Replaces the running epic while one of its delayed outputs is still in
//! flight. The replaced epic's late output never reaches the store.
//!
//! ```text
//! t=0    run(v1), dispatch(Search "ru")     v1 would answer at t=300ms
//! t=100  run(v2)                            v1 cancelled, its answer dropped
//! t=100  dispatch(Search "rust")            v2 answers at once
//! ```
//!
//! Run with: `RUST_LOG=info cargo run --example hot_swap`

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast::error::TryRecvError;
use tracing_subscriber::EnvFilter;

use epicflow::{emit, Action, EpicFn, EpicMiddleware, EpicRef, Store};

#[derive(Debug, Clone, PartialEq)]
enum Msg {
    Search(String),
    Results { query: String, by: &'static str },
}

impl Action for Msg {
    fn action_type(&self) -> &str {
        match self {
            Msg::Search(_) => "SEARCH",
            Msg::Results { .. } => "RESULTS",
        }
    }
}

fn searcher(version: &'static str, latency: Duration) -> EpicRef<Msg, Vec<String>> {
    EpicFn::arc(version, move |actions, _state, _deps| {
        Ok(emit(actions.of_type(["SEARCH"]).subscribe().then(move |msg| async move {
            tokio::time::sleep(latency).await;
            let query = match msg {
                Msg::Search(q) => q,
                Msg::Results { query, .. } => query,
            };
            Msg::Results { query, by: version }
        })))
    })
}

fn reduce(log: &mut Vec<String>, msg: &Msg) {
    if let Msg::Results { query, by } = msg {
        log.push(format!("{by}: {query}"));
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mw = EpicMiddleware::new();
    let mut events = mw.events();
    let store = Store::with_middleware(reduce, Vec::new(), vec![Arc::new(mw.clone())])?;

    mw.run(searcher("v1", Duration::from_millis(300)))?;
    store.dispatch(Msg::Search("ru".into()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    mw.run(searcher("v2", Duration::ZERO))?;
    store.dispatch(Msg::Search("rust".into()));
    tokio::time::sleep(Duration::from_millis(400)).await;

    println!("results: {:?}", store.get_state());
    loop {
        match events.try_recv() {
            Ok(ev) => println!("event: {:?} epic={:?} gen={:?}", ev.kind, ev.epic, ev.generation),
            Err(TryRecvError::Lagged(n)) => println!("skipped {n} events"),
            Err(_) => break,
        }
    }
    Ok(())
}
