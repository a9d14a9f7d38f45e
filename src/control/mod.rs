//! Control channel: topics, payloads and the publish/subscribe seam
//!
//! The controller and the show workers only talk to a [`ControlChannel`].
//! [`LocalBroker`] is the in-process implementation with MQTT topic
//! semantics; [`ConsoleBridge`] feeds it from stdin.
//!
//! # Topics
//!
//! With prefix `led` and system name `hall`:
//!
//! | Topic                              | Payload                               |
//! |------------------------------------|---------------------------------------|
//! | `led/hall/show/start`              | `{"name": "...", "parameters": {..}}` |
//! | `led/hall/show/stop`               | empty, `{"name": "..."}` or a name    |
//! | `led/hall/show/brightness`         | `0.0` - `1.0`                         |
//! | `led/hall/show/<name>/parameters`  | `{"param": value, ...}`               |
//! | `led/hall/show/current`            | retained name of the running show     |
//! | `led/hall/notification`            | human readable text                   |

pub mod broker;
pub mod console;

pub use broker::LocalBroker;
pub use console::ConsoleBridge;

use crate::error::{Result, StripError};
use crossbeam_channel::{never, Receiver};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// One message on the control channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: String,
    /// Delivered from the retained store rather than live
    pub retained: bool,
}

impl ControlMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            retained: false,
        }
    }
}

/// Publish/subscribe transport
pub trait ControlChannel: Send + Sync {
    /// Publish `payload` on `topic`; a retained message replaces the
    /// previous retained one and is delivered to later subscribers
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<()>;

    /// Receive every message matching `filter` (`+` and `#` wildcards)
    ///
    /// Dropping the [`Subscription`] ends it.
    fn subscribe(&self, filter: &str) -> Result<Subscription>;
}

/// The receiving end of one subscription
///
/// The channel keeps a [`Weak`] handle to the liveness marker and forgets
/// the subscription once this value is dropped.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<ControlMessage>,
    _alive: Arc<()>,
}

impl Subscription {
    /// Wrap `receiver`; the returned marker reports whether it is still held
    pub fn new(receiver: Receiver<ControlMessage>) -> (Self, Weak<()>) {
        let alive = Arc::new(());
        let marker = Arc::downgrade(&alive);
        (
            Self {
                receiver,
                _alive: alive,
            },
            marker,
        )
    }

    /// A subscription that never receives anything
    pub fn never() -> Self {
        Self {
            receiver: never(),
            _alive: Arc::new(()),
        }
    }

    pub fn receiver(&self) -> &Receiver<ControlMessage> {
        &self.receiver
    }
}

impl Deref for Subscription {
    type Target = Receiver<ControlMessage>;

    fn deref(&self) -> &Self::Target {
        &self.receiver
    }
}

/// What a topic below `<prefix>/<sys_name>` addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicCommand {
    Start,
    Stop,
    Brightness,
    Parameters { show: String },
    Current,
    Notification,
}

/// Topic names of one controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    prefix: String,
    sys_name: String,
}

impl Topics {
    pub fn new(prefix: impl Into<String>, sys_name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            sys_name: sys_name.into(),
        }
    }

    fn show_topic(&self, command: &str) -> String {
        format!("{}/{}/show/{}", self.prefix, self.sys_name, command)
    }

    pub fn start(&self) -> String {
        self.show_topic("start")
    }

    pub fn stop(&self) -> String {
        self.show_topic("stop")
    }

    pub fn brightness(&self) -> String {
        self.show_topic("brightness")
    }

    pub fn current(&self) -> String {
        self.show_topic("current")
    }

    pub fn parameters(&self, show: &str) -> String {
        format!("{}/{}/show/{}/parameters", self.prefix, self.sys_name, show)
    }

    pub fn notification(&self) -> String {
        format!("{}/{}/notification", self.prefix, self.sys_name)
    }

    /// Expand a topic relative to `<prefix>/<sys_name>/show/`
    ///
    /// Topics already below `<prefix>/<sys_name>/` are returned unchanged.
    pub fn resolve(&self, topic: &str) -> String {
        let base = format!("{}/{}/", self.prefix, self.sys_name);
        if topic.starts_with(&base) {
            topic.to_string()
        } else {
            self.show_topic(topic.trim_start_matches('/'))
        }
    }

    /// Decompose a topic of this controller; foreign topics give `None`
    pub fn parse(&self, topic: &str) -> Option<TopicCommand> {
        let mut levels = topic.split('/');
        if levels.next()? != self.prefix || levels.next()? != self.sys_name {
            return None;
        }

        let rest: Vec<&str> = levels.collect();
        match rest.as_slice() {
            ["notification"] => Some(TopicCommand::Notification),
            ["show", "start"] => Some(TopicCommand::Start),
            ["show", "stop"] => Some(TopicCommand::Stop),
            ["show", "brightness"] => Some(TopicCommand::Brightness),
            ["show", "current"] => Some(TopicCommand::Current),
            ["show", show, "parameters"] if !show.is_empty() => Some(TopicCommand::Parameters {
                show: (*show).to_string(),
            }),
            _ => None,
        }
    }
}

/// Payload of the start topic
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StartRequest {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl StartRequest {
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| {
            StripError::Channel(format!("Invalid start request {:?}: {}", payload, e))
        })
    }
}

/// Payload of the stop topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRequest {
    /// Stop whatever runs
    Any,
    /// Stop only if this show runs; `"all"` matches any show
    Named(String),
}

#[derive(Deserialize)]
struct NamedStop {
    name: String,
}

impl StopRequest {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();
        if payload.is_empty() {
            return StopRequest::Any;
        }
        if let Ok(NamedStop { name }) = serde_json::from_str(payload) {
            return StopRequest::Named(name);
        }
        if let Ok(Value::String(name)) = serde_json::from_str(payload) {
            return StopRequest::Named(name);
        }
        StopRequest::Named(payload.to_string())
    }

    pub fn matches(&self, running: &str) -> bool {
        match self {
            StopRequest::Any => true,
            StopRequest::Named(name) => name == "all" || name == running,
        }
    }
}

/// Parse a brightness payload; clamping is left to the driver
pub fn parse_brightness(payload: &str) -> Result<f32> {
    payload
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| StripError::Channel(format!("Invalid brightness {:?}", payload)))
}

/// Parse a live parameter update
pub fn parse_parameters(payload: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StripError::Channel(format!(
            "Parameter updates must be a JSON object (got {})",
            other
        ))),
        Err(e) => Err(StripError::Channel(format!(
            "Invalid parameter update {:?}: {}",
            payload, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Topics {
        Topics::new("led", "hall")
    }

    #[test]
    fn test_topic_names() {
        let t = topics();
        assert_eq!(t.start(), "led/hall/show/start");
        assert_eq!(t.stop(), "led/hall/show/stop");
        assert_eq!(t.brightness(), "led/hall/show/brightness");
        assert_eq!(t.current(), "led/hall/show/current");
        assert_eq!(t.parameters("rainbow"), "led/hall/show/rainbow/parameters");
        assert_eq!(t.notification(), "led/hall/notification");
    }

    #[test]
    fn test_parse_topics() {
        let t = topics();
        assert_eq!(t.parse(&t.start()), Some(TopicCommand::Start));
        assert_eq!(t.parse(&t.stop()), Some(TopicCommand::Stop));
        assert_eq!(t.parse(&t.brightness()), Some(TopicCommand::Brightness));
        assert_eq!(
            t.parse(&t.parameters("rainbow")),
            Some(TopicCommand::Parameters {
                show: "rainbow".to_string()
            })
        );
        assert_eq!(t.parse("led/kitchen/show/start"), None);
        assert_eq!(t.parse("led/hall/show/start/extra"), None);
        assert_eq!(t.parse("led"), None);
    }

    #[test]
    fn test_resolve_relative_topics() {
        let t = topics();
        assert_eq!(t.resolve("start"), t.start());
        assert_eq!(t.resolve("rainbow/parameters"), t.parameters("rainbow"));
        assert_eq!(t.resolve("led/hall/notification"), t.notification());
    }

    #[test]
    fn test_start_request() {
        let request =
            StartRequest::parse(r#"{"name": "solidcolor", "parameters": {"color": [1, 2, 3]}}"#)
                .unwrap();
        assert_eq!(request.name, "solidcolor");
        assert_eq!(request.parameters.len(), 1);

        let bare = StartRequest::parse(r#"{"name": "clear"}"#).unwrap();
        assert!(bare.parameters.is_empty());

        assert!(StartRequest::parse("clear").is_err());
    }

    #[test]
    fn test_stop_request() {
        assert_eq!(StopRequest::parse(""), StopRequest::Any);
        assert_eq!(
            StopRequest::parse(r#"{"name": "rainbow"}"#),
            StopRequest::Named("rainbow".to_string())
        );
        assert_eq!(
            StopRequest::parse("\"rainbow\""),
            StopRequest::Named("rainbow".to_string())
        );
        assert_eq!(
            StopRequest::parse("rainbow"),
            StopRequest::Named("rainbow".to_string())
        );

        assert!(StopRequest::Any.matches("clear"));
        assert!(StopRequest::parse("all").matches("clear"));
        assert!(StopRequest::parse("rainbow").matches("rainbow"));
        assert!(!StopRequest::parse("rainbow").matches("clear"));
    }

    #[test]
    fn test_parse_payloads() {
        assert_eq!(parse_brightness(" 0.25 ").unwrap(), 0.25);
        assert!(parse_brightness("bright").is_err());
        assert!(parse_brightness("NaN").is_err());

        assert_eq!(parse_parameters(r#"{"a": 1}"#).unwrap().len(), 1);
        assert!(parse_parameters("[1]").is_err());
        assert!(parse_parameters("{").is_err());
    }
}
