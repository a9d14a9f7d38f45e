//! Typed show parameters
//!
//! Every show keeps its parameters as a plain struct of [`Parameter<T>`]
//! fields. For network input the show hands out a [`ParameterStore`], a
//! short-lived view that registers those fields by name and routes raw JSON
//! values to them.
//!
//! Setting a value goes through three steps:
//!
//! 1. the optional preprocessor normalizes the wire representation
//! 2. the value is decoded into `T`
//! 3. the optional verifier checks range and shape
//!
//! If any step fails the previous value is kept.
//!
//! # Example
//!
//! ```ignore
//! struct Params {
//!     fadetime_sec: Parameter<f64>,
//! }
//!
//! let mut params = Params {
//!     fadetime_sec: Parameter::new("fadetime_sec", 2.0)
//!         .verified_by(|v, name| verify::not_negative_numeric(*v, name)),
//! };
//!
//! let mut store = ParameterStore::new();
//! store.register(&mut params.fadetime_sec);
//! store.set("fadetime_sec", &json!(0.5))?;
//! ```

pub mod preprocess;
pub mod verify;

use crate::error::ParameterError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Checks a decoded value; gets the parameter name for the error message
pub type Verifier<T> = Box<dyn Fn(&T, &str) -> Result<(), ParameterError> + Send>;

/// Rewrites a raw value before decoding
pub type Preprocessor = fn(Value) -> Value;

/// One named, typed parameter with its checks
pub struct Parameter<T> {
    name: &'static str,
    value: T,
    verifier: Option<Verifier<T>>,
    preprocessor: Option<Preprocessor>,
}

impl<T> Parameter<T> {
    pub fn new(name: &'static str, default: T) -> Self {
        Self {
            name,
            value: default,
            verifier: None,
            preprocessor: None,
        }
    }

    pub fn verified_by<F>(mut self, verifier: F) -> Self
    where
        F: Fn(&T, &str) -> Result<(), ParameterError> + Send + 'static,
    {
        self.verifier = Some(Box::new(verifier));
        self
    }

    pub fn preprocessed_by(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Run the verifier against the current value
    pub fn verify(&self) -> Result<(), ParameterError> {
        match &self.verifier {
            Some(verifier) => verifier(&self.value, self.name),
            None => Ok(()),
        }
    }

    /// Store a typed value if the verifier accepts it
    pub fn set_value(&mut self, value: T) -> Result<(), ParameterError> {
        if let Some(verifier) = &self.verifier {
            verifier(&value, self.name)?;
        }
        self.value = value;
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for Parameter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// Type-erased access to a [`Parameter`]
pub trait ParameterSlot: Send {
    fn name(&self) -> &'static str;

    /// Preprocess, decode and verify `raw`; keep the old value on failure
    fn set_raw(&mut self, raw: &Value) -> Result<(), ParameterError>;

    /// Current value in wire form
    fn current(&self) -> Value;
}

impl<T> ParameterSlot for Parameter<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn set_raw(&mut self, raw: &Value) -> Result<(), ParameterError> {
        let prepared = match self.preprocessor {
            Some(preprocess) => preprocess(raw.clone()),
            None => raw.clone(),
        };
        let value: T = serde_json::from_value(prepared)
            .map_err(|e| ParameterError::invalid(self.name, format!("has the wrong type: {}", e), raw))?;
        self.set_value(value)
    }

    fn current(&self) -> Value {
        serde_json::to_value(&self.value).unwrap_or(Value::Null)
    }
}

/// Named view over the parameters of one show
#[derive(Default)]
pub struct ParameterStore<'a> {
    slots: Vec<&'a mut dyn ParameterSlot>,
}

impl<'a> ParameterStore<'a> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Register a parameter by its name
    ///
    /// # Panics
    ///
    /// If a parameter with the same name is already registered.
    pub fn register(&mut self, slot: &'a mut dyn ParameterSlot) -> &mut Self {
        assert!(
            !self.contains(slot.name()),
            "Parameter \"{}\" is registered twice",
            slot.name()
        );
        self.slots.push(slot);
        self
    }

    /// Builder form of [`ParameterStore::register`]
    pub fn with(mut self, slot: &'a mut dyn ParameterSlot) -> Self {
        self.register(slot);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|slot| slot.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Set one parameter from its wire value
    ///
    /// Rejected values are logged and the previous value is kept.
    pub fn set(&mut self, name: &str, raw: &Value) -> Result<(), ParameterError> {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.name() == name) else {
            tracing::warn!("Rejected unknown parameter \"{}\"", name);
            return Err(ParameterError::unknown(name));
        };

        match slot.set_raw(raw) {
            Ok(()) => {
                tracing::debug!("Parameter \"{}\" set to {}", name, raw);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{}; keeping {}", e, slot.current());
                Err(e)
            }
        }
    }

    /// Set every entry of `values`, continuing past failures
    ///
    /// Returns how many were applied.
    pub fn apply_many(&mut self, values: &Map<String, Value>) -> usize {
        let mut applied = 0;
        for (name, raw) in values {
            if self.set(name, raw).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Set every entry of `values` and report the first rejection
    ///
    /// Used for the parameters a show is started with, where any rejected
    /// value makes the show unrunnable.
    pub fn apply_all(&mut self, values: &Map<String, Value>) -> Result<(), ParameterError> {
        let mut first_error = None;
        for (name, raw) in values {
            if let Err(e) = self.set(name, raw) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Current values of all parameters
    pub fn describe(&self) -> Map<String, Value> {
        self.slots
            .iter()
            .map(|slot| (slot.name().to_string(), slot.current()))
            .collect()
    }
}

impl fmt::Debug for ParameterStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|slot| (slot.name(), slot.current())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use serde_json::json;

    struct Params {
        fadetime_sec: Parameter<f64>,
        color: Parameter<Option<Rgb>>,
        steps: Parameter<u32>,
    }

    impl Params {
        fn new() -> Self {
            Self {
                fadetime_sec: Parameter::new("fadetime_sec", 2.0)
                    .verified_by(|v, name| verify::not_negative_numeric(*v, name)),
                color: Parameter::new("color", None)
                    .verified_by(verify::required_rgb_color)
                    .preprocessed_by(preprocess::color_from_wire),
                steps: Parameter::new("steps", 10)
                    .verified_by(|v, name| verify::positive_integer(i64::from(*v), name)),
            }
        }

        fn store(&mut self) -> ParameterStore<'_> {
            ParameterStore::new()
                .with(&mut self.fadetime_sec)
                .with(&mut self.color)
                .with(&mut self.steps)
        }
    }

    #[test]
    fn test_set_valid_values() {
        let mut params = Params::new();
        let mut store = params.store();
        store.set("fadetime_sec", &json!(0.5)).unwrap();
        store.set("color", &json!("#102030")).unwrap();
        store.set("steps", &json!(35)).unwrap();
        drop(store);

        assert_eq!(*params.fadetime_sec.get(), 0.5);
        assert_eq!(*params.color.get(), Some((16.0, 32.0, 48.0)));
        assert_eq!(*params.steps.get(), 35);
    }

    #[test]
    fn test_invalid_value_keeps_previous() {
        let mut params = Params::new();
        let mut store = params.store();

        let err = store.set("fadetime_sec", &json!(-1)).unwrap_err();
        assert!(matches!(err, ParameterError::Invalid { .. }));
        assert!(store.set("steps", &json!(2.5)).is_err());
        assert!(store.set("steps", &json!(0)).is_err());
        assert!(store.set("color", &json!([1, 2])).is_err());
        drop(store);

        assert_eq!(*params.fadetime_sec.get(), 2.0);
        assert_eq!(*params.steps.get(), 10);
        assert_eq!(*params.color.get(), None);
    }

    #[test]
    fn test_unknown_parameter() {
        let mut params = Params::new();
        let mut store = params.store();
        assert_eq!(
            store.set("speed", &json!(1)),
            Err(ParameterError::unknown("speed"))
        );
    }

    #[test]
    fn test_apply_many_continues_past_failures() {
        let mut params = Params::new();
        let values = json!({"fadetime_sec": 1.0, "bogus": 3, "steps": -4, "color": [9, 8, 7]});
        let applied = params.store().apply_many(values.as_object().unwrap());
        assert_eq!(applied, 2);
        assert_eq!(*params.fadetime_sec.get(), 1.0);
        assert_eq!(*params.color.get(), Some((9.0, 8.0, 7.0)));
        assert_eq!(*params.steps.get(), 10);
    }

    #[test]
    fn test_apply_all_reports_first_rejection() {
        let mut params = Params::new();
        let values = json!({"fadetime_sec": 0.25, "steps": 0});
        let err = params.store().apply_all(values.as_object().unwrap()).unwrap_err();
        assert_eq!(err.name(), "steps");
        assert_eq!(*params.fadetime_sec.get(), 0.25);

        let values = json!({"steps": 3});
        assert!(params.store().apply_all(values.as_object().unwrap()).is_ok());
    }

    #[test]
    fn test_describe_lists_current_values() {
        let mut params = Params::new();
        let described = params.store().describe();
        assert_eq!(described.get("fadetime_sec"), Some(&json!(2.0)));
        assert_eq!(described.get("color"), Some(&Value::Null));
        assert_eq!(described.len(), 3);
    }

    #[test]
    fn test_required_parameter_reports_missing() {
        let params = Params::new();
        assert_eq!(params.color.verify(), Err(ParameterError::missing("color")));
        assert!(params.fadetime_sec.verify().is_ok());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_registration_panics() {
        let mut a = Parameter::new("x", 1.0f64);
        let mut b = Parameter::new("x", 2.0f64);
        let mut store = ParameterStore::new();
        store.register(&mut a);
        store.register(&mut b);
    }
}
