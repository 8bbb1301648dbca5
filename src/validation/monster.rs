//! Monster record schema and normalization.
//!
//! Turns a raw detail payload into a [`Monster`]: keeps the identifying
//! fields, hit points, the first armor class value, and each action's name
//! and description. Everything else in the payload is dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collectors::RawRecord;
use crate::error::ValidationError;

/// One action a monster can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub desc: String,
}

/// A validated, normalized monster record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    /// Catalog identifier the record was fetched by.
    pub index: String,

    /// Display name.
    pub name: String,

    pub hit_points: u32,

    /// First listed armor class value, if the payload has one.
    pub armor_class: Option<u32>,

    /// Actions in payload order. Empty when the payload lists none.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// The record type every successful item normalizes to.
pub type NormalizedRecord = Monster;

/// Validate a raw payload and normalize it.
///
/// Shape problems in every field are collected and reported together as
/// [`ValidationError::SchemaViolation`], with paths such as `actions[1].desc`.
/// Only a payload with a correct shape is checked for out-of-range values.
pub fn validate(raw: &RawRecord) -> Result<Monster, ValidationError> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationError::SchemaViolation {
            fields: vec!["$".to_string()],
        });
    };

    let mut checker = Checker::default();

    let index = checker.required_string(object, "index");
    let name = checker.required_string(object, "name");
    let hit_points = checker.required_integer(object, "hit_points");
    let armor_class = checker.armor_class(object.get("armor_class"));
    let actions = checker.actions(object.get("actions"));

    if !checker.violations.is_empty() {
        return Err(ValidationError::SchemaViolation {
            fields: checker.violations,
        });
    }

    let (Some(index), Some(name), Some(hit_points)) = (index, name, hit_points) else {
        return Err(ValidationError::SchemaViolation {
            fields: vec!["$".to_string()],
        });
    };

    Ok(Monster {
        index,
        name,
        hit_points: non_negative("hit_points", hit_points)?,
        armor_class: armor_class
            .map(|(field, value)| non_negative(&field, value))
            .transpose()?,
        actions,
    })
}

fn non_negative(field: &str, value: i64) -> Result<u32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::ValueOutOfRange {
            field: field.to_string(),
            reason: format!("must be >= 0, got {value}"),
        });
    }
    u32::try_from(value).map_err(|_| ValidationError::ValueOutOfRange {
        field: field.to_string(),
        reason: format!("{value} exceeds {}", u32::MAX),
    })
}

/// Integer value of a JSON number, accepting integral floats like `7.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Accumulates the paths of fields with a wrong shape.
#[derive(Default)]
struct Checker {
    violations: Vec<String>,
}

impl Checker {
    fn flag(&mut self, path: impl Into<String>) {
        self.violations.push(path.into());
    }

    fn required_string(&mut self, object: &Map<String, Value>, field: &str) -> Option<String> {
        self.string_at(object.get(field), field)
    }

    fn string_at(&mut self, value: Option<&Value>, path: &str) -> Option<String> {
        match value.and_then(Value::as_str) {
            Some(s) => Some(s.to_string()),
            None => {
                self.flag(path);
                None
            }
        }
    }

    fn required_integer(&mut self, object: &Map<String, Value>, field: &str) -> Option<i64> {
        self.integer_at(object.get(field), field)
    }

    fn integer_at(&mut self, value: Option<&Value>, path: &str) -> Option<i64> {
        match value.and_then(as_integer) {
            Some(n) => Some(n),
            None => {
                self.flag(path);
                None
            }
        }
    }

    /// Armor class is either a bare integer or a list of `{type, value}`
    /// objects; the first `value` wins. Returns the path the value came from.
    fn armor_class(&mut self, value: Option<&Value>) -> Option<(String, i64)> {
        match value {
            None | Some(Value::Null) => None,
            Some(Value::Number(_)) => self
                .integer_at(value, "armor_class")
                .map(|n| ("armor_class".to_string(), n)),
            Some(Value::Array(items)) => {
                let first = items.first()?;
                let Some(entry) = first.as_object() else {
                    self.flag("armor_class[0]");
                    return None;
                };
                let path = "armor_class[0].value";
                self.integer_at(entry.get("value"), path)
                    .map(|n| (path.to_string(), n))
            }
            Some(_) => {
                self.flag("armor_class");
                None
            }
        }
    }

    fn actions(&mut self, value: Option<&Value>) -> Vec<Action> {
        let items = match value {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.flag("actions");
                return Vec::new();
            }
        };

        let mut actions = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let Some(entry) = item.as_object() else {
                self.flag(format!("actions[{i}]"));
                continue;
            };
            let name = self.string_at(entry.get("name"), &format!("actions[{i}].name"));
            let desc = self.string_at(entry.get("desc"), &format!("actions[{i}].desc"));
            if let (Some(name), Some(desc)) = (name, desc) {
                actions.push(Action { name, desc });
            }
        }
        actions
    }
}
