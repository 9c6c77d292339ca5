//! MqBus Console - interactive driver for the in-process bus
//!
//! Reads commands from stdin, one per line, and runs them against a
//! `LocalBus`. Messages and query results go to stdout as JSON lines, logs
//! go to stderr.

mod command;
mod config;

use mqbus_core::{Bus, LocalBus, Receiver};
use mqbus_types::{Message, Qos};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::command::{Command, HELP};
use crate::config::ConsoleConfig;

fn init_logging(config: &ConsoleConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_filter.as_str().into());

    let (json, pretty) = if config.log_json {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

fn print_message(message: &Message) {
    match serde_json::to_string(message) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, topic = %message.topic(), "Failed to encode message"),
    }
}

/// Print everything a subscription receives until it is terminated.
fn spawn_printer(mut receiver: Receiver) {
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            print_message(&message);
        }
        debug!(subscription = %receiver.id(), "Subscription ended");
    });
}

async fn execute(bus: &LocalBus, command: Command) -> mqbus_types::Result<()> {
    match command {
        Command::Subscribe(filter) => {
            let receiver = bus.subscribe(&filter, Qos::AtMostOnce).await?;
            println!("subscribed {filter} ({})", receiver.id());
            spawn_printer(receiver);
        }
        Command::Unsubscribe(filter) => {
            bus.unsubscribe(&filter).await?;
            println!("unsubscribed {filter}");
        }
        Command::Publish {
            topic,
            payload,
            retained,
        } => {
            bus.publish(Message::new(topic, payload), Qos::AtMostOnce, retained)
                .await?;
        }
        Command::Get(filter) => {
            let mut messages = bus.get(&filter, Qos::AtMostOnce).await?;
            messages.sort_by(|a, b| a.topic().cmp(b.topic()));
            for message in &messages {
                print_message(message);
            }
        }
        Command::Stats => {
            let stats = bus.stats();
            println!(
                "subscriptions={} retained_topics={} in_flight={}",
                stats.subscriptions, stats.retained_topics, stats.in_flight
            );
        }
        Command::Settle => {
            bus.settle().await;
            println!("settled");
        }
        Command::Close => {
            bus.close().await?;
            println!("closed");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::load()?;
    init_logging(&config);

    let bus = LocalBus::with_config(config.bus.clone())?;
    info!("MqBus console ready, type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                eprintln!("error: {e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        if let Err(e) = execute(&bus, command).await {
            eprintln!("error: {e}");
        }
    }

    bus.close().await?;
    info!("MqBus console stopped");
    Ok(())
}
