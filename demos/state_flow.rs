//! Current-state streams
//!
//! Run with: cargo run --example state_flow
//!
//! ## Scenarios
//!
//! - Counter: starts at 5, updated to 1 then 2 before a collector joins.
//!   The collector sees 2 (the current value), then 8.
//! - Login state: a collector joining after login sees only `true`.
//! - Score: a replay-1 broadcaster hands the last score to a late collector.
//! - Conflation: setting an unchanged state emits nothing.

use replaycast::{sink, BroadcasterConfig, ReplayBroadcaster, StateBroadcaster};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("replaycast=info".parse()?)
                .add_directive("state_flow=info".parse()?),
        )
        .init();

    let counter = StateBroadcaster::named("counter", 5);
    counter.set(1);
    counter.set(2);

    counter.subscribe(sink::from_fn(|value: &i32| {
        println!("StateFlow Collector: {}", value);
    }));

    counter.set(8);

    let logged_in = StateBroadcaster::named("login", false);
    logged_in.set(true);

    logged_in.subscribe(sink::from_fn(|is_logged_in: &bool| {
        if *is_logged_in {
            println!("User is logged in - Show account screen");
        } else {
            println!("User is logged out - Show login screen");
        }
    }));

    let score = ReplayBroadcaster::with_config(BroadcasterConfig::with_replay(1).name("score"))?;
    score.emit(3);

    score.subscribe(sink::from_fn(|value: &u32| {
        println!("Current Score: {}", value);
    }));

    // Same value again: no emission, the collector prints nothing
    let emitted = counter.set(8);
    println!(
        "Setting counter to its current value emitted: {} (emissions so far: {})",
        emitted,
        counter.stats().emitted
    );

    Ok(())
}
