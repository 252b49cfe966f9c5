//! Declarative input schemas for actions.
//!
//! A schema lists the fields an action accepts and the constraint on each.
//! Validation is strict on declared fields and permissive on the envelope:
//! unknown fields are dropped, and every violated constraint is reported in a
//! single [`ValidationError`].

use std::collections::BTreeMap;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::error::ActionError;

/// Constraint applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `0x`-prefixed 20-byte hex address; mixed case must be EIP-55 checksummed.
    Address,
    /// Non-empty base-10 digit string, no sign or decimal point.
    WeiAmount,
    /// Non-negative base-10 decimal, e.g. a price.
    Decimal,
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn address(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Address,
            required: true,
        }
    }

    pub fn wei_amount(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::WeiAmount,
            required: true,
        }
    }

    pub fn decimal(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Decimal,
            required: true,
        }
    }

    pub fn one_of(
        name: &'static str,
        description: &'static str,
        choices: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::OneOf(choices),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All constraint violations found in one input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid input: {}", render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

fn render_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Normalized, immutable input produced by [`ActionSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    fields: BTreeMap<&'static str, String>,
}

impl ValidatedInput {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The normalized input as a JSON object.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }

    /// Deserialize into a typed argument struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ActionError> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            ActionError::Validation(ValidationError::new(vec![FieldViolation::new(
                "$",
                e.to_string(),
            )]))
        })
    }
}

/// Input description of one action.
#[derive(Debug, Clone)]
pub struct ActionSchema {
    description: &'static str,
    fields: Vec<FieldSpec>,
}

impl ActionSchema {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Check `raw` against every declared field.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedInput, ValidationError> {
        let Some(object) = raw.as_object() else {
            return Err(ValidationError::new(vec![FieldViolation::new(
                "$",
                "Expected an object",
            )]));
        };

        let mut fields = BTreeMap::new();
        let mut violations = Vec::new();

        for spec in &self.fields {
            match object.get(spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        violations.push(FieldViolation::new(spec.name, "Required"));
                    }
                }
                Some(Value::String(s)) => match check_field(spec.kind, s) {
                    Ok(normalized) => {
                        fields.insert(spec.name, normalized);
                    }
                    Err(message) => violations.push(FieldViolation::new(spec.name, message)),
                },
                Some(_) => violations.push(FieldViolation::new(spec.name, "Expected a string")),
            }
        }

        if violations.is_empty() {
            Ok(ValidatedInput { fields })
        } else {
            Err(ValidationError::new(violations))
        }
    }

    /// JSON Schema rendering, published as action metadata.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for spec in &self.fields {
            let mut property = json!({
                "type": "string",
                "description": spec.description,
            });
            match spec.kind {
                FieldKind::Address => {
                    property["pattern"] = json!("^0x[0-9a-fA-F]{40}$");
                }
                FieldKind::WeiAmount => {
                    property["pattern"] = json!("^\\d+$");
                }
                FieldKind::Decimal => {
                    property["pattern"] = json!("^\\d+(\\.\\d+)?$");
                }
                FieldKind::OneOf(choices) => {
                    property["enum"] = json!(choices);
                }
            }
            properties.insert(spec.name.to_string(), property);
            if spec.required {
                required.push(spec.name);
            }
        }
        json!({
            "type": "object",
            "description": self.description,
            "properties": properties,
            "required": required,
        })
    }
}

fn check_field(kind: FieldKind, value: &str) -> Result<String, String> {
    match kind {
        FieldKind::Address => parse_address(value).map(|a| a.to_string()),
        FieldKind::WeiAmount => {
            if is_wei_amount(value) {
                Ok(value.to_string())
            } else {
                Err("Must be a valid wei amount".to_string())
            }
        }
        FieldKind::Decimal => parse_decimal(value)
            .map(|d| d.normalize().to_string())
            .ok_or_else(|| "Must be a non-negative decimal number".to_string()),
        FieldKind::OneOf(choices) => {
            if choices.contains(&value) {
                Ok(value.to_string())
            } else {
                Err(format!("Expected one of: {}", choices.join(", ")))
            }
        }
    }
}

pub fn is_wei_amount(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Digits with at most one decimal point; no sign or exponent.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let (whole, frac) = value.split_once('.').unwrap_or((value, "0"));
    if whole.is_empty() || !is_wei_amount(whole) || !is_wei_amount(frac) {
        return None;
    }
    value.parse::<Decimal>().ok()
}

/// Parse an address, enforcing the EIP-55 checksum when the input is mixed case.
pub fn parse_address(value: &str) -> Result<Address, String> {
    let hex = value
        .strip_prefix("0x")
        .ok_or_else(|| "Invalid address: missing 0x prefix".to_string())?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("Invalid address: expected 40 hex characters".to_string());
    }
    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(value, None)
            .map_err(|_| "Invalid address: checksum mismatch".to_string())
    } else {
        value
            .parse::<Address>()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
