//! Shared stream with replay
//!
//! Run with: cargo run --example shared_flow
//!
//! A broadcaster with replay capacity 3 emits 1..=5 before anyone listens.
//! A collector task joining afterwards first receives the last three values
//! (3, 4, 5) and then every live value (6).
//!
//! A second broadcaster without replay shows the opposite: a message
//! emitted before the collector joins is never seen by it.

use replaycast::{BroadcasterConfig, ReplayBroadcaster};
use tokio::sync::mpsc;

/// Spawn a task printing everything a new subscriber receives
///
/// The task ends once the broadcaster, and with it the sender, is dropped.
fn spawn_collector<T>(
    label: &'static str,
    broadcaster: &ReplayBroadcaster<T>,
) -> tokio::task::JoinHandle<usize>
where
    T: Clone + Send + std::fmt::Display + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    broadcaster.subscribe(tx);

    tokio::spawn(async move {
        let mut count = 0;
        while let Some(value) = rx.recv().await {
            println!("{}: {}", label, value);
            count += 1;
        }
        count
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("replaycast=debug".parse()?)
                .add_directive("shared_flow=debug".parse()?),
        )
        .init();

    // Replay the last three values to late collectors
    let numbers =
        ReplayBroadcaster::with_config(BroadcasterConfig::with_replay(3).name("numbers"))?;

    for v in 1..=5 {
        numbers.emit(v);
    }

    let collector = spawn_collector("SharedFlow Collector", &numbers);

    numbers.emit(6);

    println!("Replay cache: {:?}", numbers.history());
    let stats = numbers.stats();
    println!("Stats: {:?}", stats);
    println!(
        "Delivery attempts: {}, loss ratio: {:.2}",
        stats.attempts(),
        stats.loss_ratio()
    );

    drop(numbers);
    let received = collector.await?;
    println!("Collector received {} values\n", received);

    // No replay: the message is gone before the collector subscribes
    let messages = ReplayBroadcaster::with_config(
        BroadcasterConfig::with_replay(0).name("messages"),
    )?;

    messages.emit("Hello, you've got a message!".to_string());
    let collector = spawn_collector("New message", &messages);

    drop(messages);
    let received = collector.await?;
    println!("Late collector without replay received {} messages", received);

    Ok(())
}
