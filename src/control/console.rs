//! Drive the control channel from a terminal
//!
//! Each input line is `<topic> <payload>`. Topics may be relative to the
//! controller's show topics, so these two lines are equivalent:
//!
//! ```text
//! led/hall/show/start {"name": "rainbow"}
//! start {"name": "rainbow"}
//! ```
//!
//! Empty lines and lines starting with `#` are skipped.

use super::{ControlChannel, Topics};
use crate::error::{Result, ResultExt};
use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub struct ConsoleBridge {
    channel: Arc<dyn ControlChannel>,
    topics: Topics,
}

impl ConsoleBridge {
    pub fn new(channel: Arc<dyn ControlChannel>, topics: Topics) -> Self {
        Self { channel, topics }
    }

    /// Split a line into absolute topic and payload
    pub fn parse_line(&self, line: &str) -> Option<(String, String)> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (topic, payload) = match line.split_once(char::is_whitespace) {
            Some((topic, payload)) => (topic, payload.trim()),
            None => (line, ""),
        };
        Some((self.topics.resolve(topic), payload.to_string()))
    }

    /// Log every status and notification publication
    ///
    /// The thread ends once the channel drops its subscribers.
    pub fn spawn_status_logger(&self) -> Result<JoinHandle<()>> {
        let current = self.channel.subscribe(&self.topics.current())?;
        let notifications = self.channel.subscribe(&self.topics.notification())?;

        thread::Builder::new()
            .name("status-logger".to_string())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(current.receiver()) -> message => match message {
                        Ok(message) if message.payload.is_empty() => {
                            tracing::info!("Current show: none")
                        }
                        Ok(message) => tracing::info!("Current show: {}", message.payload),
                        Err(_) => break,
                    },
                    recv(notifications.receiver()) -> message => match message {
                        Ok(message) => tracing::info!("Notification: {}", message.payload),
                        Err(_) => break,
                    },
                }
            })
            .context("Failed to spawn status logger")
    }

    /// Publish every line of `input` until EOF
    ///
    /// Returns the number of published messages.
    pub fn run<R: BufRead>(&self, input: R) -> Result<usize> {
        let mut published = 0;
        for line in input.lines() {
            let line = line.context("Failed to read console input")?;
            let Some((topic, payload)) = self.parse_line(&line) else {
                continue;
            };
            match self.channel.publish(&topic, &payload, false) {
                Ok(()) => published += 1,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        tracing::info!("Console input closed");
        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::LocalBroker;

    fn bridge() -> (ConsoleBridge, Arc<LocalBroker>) {
        let broker = Arc::new(LocalBroker::new());
        let bridge = ConsoleBridge::new(broker.clone(), Topics::new("led", "hall"));
        (bridge, broker)
    }

    #[test]
    fn test_parse_line() {
        let (bridge, _) = bridge();
        assert_eq!(
            bridge.parse_line(r#"start {"name": "clear"}"#),
            Some((
                "led/hall/show/start".to_string(),
                r#"{"name": "clear"}"#.to_string()
            ))
        );
        assert_eq!(
            bridge.parse_line("stop"),
            Some(("led/hall/show/stop".to_string(), String::new()))
        );
        assert_eq!(bridge.parse_line("   "), None);
        assert_eq!(bridge.parse_line("# comment"), None);
    }

    #[test]
    fn test_run_publishes_until_eof() {
        let (bridge, broker) = bridge();
        let received = broker.subscribe("led/hall/#").unwrap();

        let input = "brightness 0.4\n\n# skip\nled/hall/show/rainbow/parameters {\"pause_sec\": 1}\n";
        assert_eq!(bridge.run(input.as_bytes()).unwrap(), 2);

        let topics: Vec<String> = received.try_iter().map(|m| m.topic).collect();
        assert_eq!(
            topics,
            vec!["led/hall/show/brightness", "led/hall/show/rainbow/parameters"]
        );
    }
}
