// src/profile.rs
//! User profile: an open JSON object edited by the frontend. The pipeline only reads
//! `interests` and `financial_data.owns`; every other field is carried through untouched
//! (it ends up in the completion prompt).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Interests in declared order. Non-string entries are skipped.
    pub fn interests(&self) -> Vec<&str> {
        string_list(self.0.get("interests"))
    }

    /// `financial_data.owns`, empty when either level is missing.
    pub fn owns(&self) -> Vec<&str> {
        let owns = self
            .0
            .get("financial_data")
            .and_then(Value::as_object)
            .and_then(|fd| fd.get("owns"));
        string_list(owns)
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests().iter().any(|i| *i == interest)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Value> for UserProfile {
    /// Anything that is not a JSON object becomes an empty profile.
    fn from(v: Value) -> Self {
        match v {
            Value::Object(m) => Self(m),
            _ => Self::default(),
        }
    }
}

fn string_list(v: Option<&Value>) -> Vec<&str> {
    v.and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
