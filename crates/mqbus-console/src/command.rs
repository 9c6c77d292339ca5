//! Console command parsing

use std::str::FromStr;

use thiserror::Error;

/// A console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Publish {
        topic: String,
        payload: String,
        retained: bool,
    },
    Get(String),
    Stats,
    Settle,
    Close,
    Help,
    Quit,
}

/// Command parse errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
commands:
  sub <filter>                 subscribe and print matching messages
  unsub <filter>               remove the subscription with exactly this filter
  pub [-r] <topic> [payload]   publish, -r retains; no payload deletes the retained topic
  get <filter>                 print retained messages matching the filter
  stats                        show bus counters
  settle                       wait for in-flight deliveries
  close                        close the bus
  quit                         exit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = split_word(line);

        match name {
            "" => Err(CommandError::Empty),
            "sub" | "subscribe" => single_arg(rest, "sub <filter>").map(Command::Subscribe),
            "unsub" | "unsubscribe" => {
                single_arg(rest, "unsub <filter>").map(Command::Unsubscribe)
            }
            "get" => single_arg(rest, "get <filter>").map(Command::Get),
            "pub" | "publish" => {
                let (first, rest) = split_word(rest);
                let (retained, topic, payload) = if first == "-r" {
                    let (topic, payload) = split_word(rest);
                    (true, topic, payload)
                } else {
                    (false, first, rest)
                };
                if topic.is_empty() {
                    return Err(CommandError::Usage("pub [-r] <topic> [payload]"));
                }
                Ok(Command::Publish {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                    retained,
                })
            }
            "stats" => Ok(Command::Stats),
            "settle" => Ok(Command::Settle),
            "close" => Ok(Command::Close),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Split off the first whitespace-delimited word, keeping the rest verbatim.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn single_arg(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    match split_word(rest) {
        (arg, "") if !arg.is_empty() => Ok(arg.to_string()),
        _ => Err(CommandError::Usage(usage)),
    }
}
