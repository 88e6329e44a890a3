//! Structured record of a T-DD build: step timings, modes and counts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

/// Stable keys of the diagnostics record.
pub mod keys {
    pub const PHI_NORMALIZATION_TIME: &str = "phi normalization time";
    pub const LEMMAS_LOADING_TIME: &str = "lemmas loading time";
    pub const VARIABLE_MAPPING_TIME: &str = "variable mapping creation time";
    pub const UNSAT_DD_TIME: &str = "UNSAT DD building time";
    pub const PHI_DD_TIME: &str = "phi DD building time";
    pub const LEMMAS_DD_TIME: &str = "t-lemmas DD building time";
    pub const QUANTIFICATION_TIME: &str = "fresh T-atoms quantification time";
    pub const JOINING_TIME: &str = "DD joining time";
    pub const TOTAL_TIME: &str = "total DD building time";
    pub const ALL_SMT_MODE: &str = "ALL SMT mode";
    pub const ALL_SMT_TIME: &str = "All-SMT computation time";
    pub const LEMMAS_AMOUNT: &str = "T-lemmas amount";
    pub const MODELS_AMOUNT: &str = "All-SMT models amount";
}

/// Key-value diagnostics; durations are stored in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: BTreeMap<String, Value>,
}

impl Diagnostics {
    pub fn record(&mut self, key: &str, value: impl Into<Value>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn record_time(&mut self, key: &str, elapsed: Duration) {
        self.record(key, elapsed.as_secs_f64());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// A recorded duration, in seconds.
    pub fn time(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// The record as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.clone().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_record() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.record(keys::ALL_SMT_MODE, "computed");
        diagnostics.record(keys::LEMMAS_AMOUNT, 3usize);
        diagnostics.record_time(keys::TOTAL_TIME, Duration::from_millis(1500));

        assert_eq!(diagnostics.get(keys::ALL_SMT_MODE), Some(&Value::from("computed")));
        assert_eq!(diagnostics.time(keys::TOTAL_TIME), Some(1.5));
        assert_eq!(diagnostics.time(keys::ALL_SMT_MODE), None);
        let json = diagnostics.to_json();
        assert_eq!(json.as_object().map(|o| o.len()), Some(3));
        assert_eq!(json["T-lemmas amount"], 3);
        assert_eq!(serde_json::to_value(&diagnostics).unwrap(), json);
    }
}
