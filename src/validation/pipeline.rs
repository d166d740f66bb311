//! Request validation pipeline.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{ServiceError, ServiceResult};
use crate::validation::rules::{FieldValue, ValidationRule};

/// Normalized values of a request that passed validation.
#[derive(Debug, Clone, Default)]
pub struct ValidatedFields {
    values: HashMap<&'static str, FieldValue>,
}

impl ValidatedFields {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Runs a fixed set of rules against a request body.
///
/// Every rule runs even after earlier failures, so a client sees all input
/// problems in one round trip.
#[derive(Debug, Clone)]
pub struct ValidationPipeline {
    rules: Vec<ValidationRule>,
}

impl ValidationPipeline {
    pub fn new(rules: Vec<ValidationRule>) -> Self {
        Self { rules }
    }

    /// Rules for `POST /product/search`.
    pub fn product_search() -> Self {
        Self::new(vec![ValidationRule::product_code(), ValidationRule::date()])
    }

    /// Validate a JSON object body.
    pub fn validate(&self, body: &Map<String, Value>) -> ServiceResult<ValidatedFields> {
        let mut fields = ValidatedFields::default();
        let mut errors = Vec::new();

        for rule in &self.rules {
            match rule.apply(body.get(rule.field)) {
                Ok(Some(value)) => {
                    fields.values.insert(rule.field, value);
                }
                Ok(None) => {}
                Err(mut rule_errors) => errors.append(&mut rule_errors),
            }
        }

        if errors.is_empty() {
            Ok(fields)
        } else {
            Err(ServiceError::validation(errors))
        }
    }

    /// Validate any JSON value. Non-object bodies are validated as empty.
    pub fn validate_value(&self, body: &Value) -> ServiceResult<ValidatedFields> {
        match body {
            Value::Object(map) => self.validate(map),
            _ => self.validate(&Map::new()),
        }
    }
}
