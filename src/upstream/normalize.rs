//! Normalization of the raw stock payload into [`ProductData`].
//!
//! The inventory API is inconsistent about field presence and numeric
//! encoding, so every field goes through a lenient lookup with a default.

use serde_json::{Map, Value};

use super::types::ProductData;

pub(crate) const STOCK_LIST: &str = "listaEstoque";
const PHYSICAL_STOCK: &str = "fIsico";
const AVERAGE_COST: &str = "nCMC";
const PRODUCT_ID: &str = "nIdProduto";
const PRODUCT_CODE: &str = "cCodigo";
const DESCRIPTION: &str = "cDescricao";

/// Build [`ProductData`] from a successful payload.
pub fn normalize(requested_code: &str, payload: &Map<String, Value>) -> ProductData {
    let flat_cost = number_field(payload, AVERAGE_COST);

    let (total_physical_stock, average_cost) = match payload.get(STOCK_LIST) {
        Some(Value::Array(records)) => aggregate(records, flat_cost),
        _ => (number_field(payload, PHYSICAL_STOCK), flat_cost),
    };

    if average_cost < 0.0 {
        tracing::warn!(code = requested_code, average_cost, "Negative average cost from upstream");
    }

    let id = match payload.get(PRODUCT_ID) {
        Some(value) => lenient_integer(value).unwrap_or_else(|| {
            tracing::debug!(field = PRODUCT_ID, "Unparseable product id, using 0");
            0
        }),
        None => 0,
    };

    let code = text_field(payload, PRODUCT_CODE).unwrap_or_else(|| requested_code.to_string());
    let description = text_field(payload, DESCRIPTION)
        .unwrap_or_else(|| format!("Product {}", requested_code));

    ProductData {
        id,
        code,
        description,
        average_cost,
        total_physical_stock,
    }
}

/// Sum quantities and compute the quantity-weighted cost.
fn aggregate(records: &[Value], flat_cost: f64) -> (f64, f64) {
    let mut total = 0.0;
    let mut weighted = 0.0;

    for record in records {
        let Some(fields) = record.as_object() else {
            tracing::debug!("Skipping non-object stock record");
            continue;
        };
        let qty = number_field(fields, PHYSICAL_STOCK);
        let cost = number_field(fields, AVERAGE_COST);
        total += qty;
        weighted += qty * cost;
    }

    let average = if total > 0.0 { weighted / total } else { flat_cost };
    (total, average)
}

fn number_field(fields: &Map<String, Value>, key: &str) -> f64 {
    match fields.get(key) {
        None | Some(Value::Null) => {
            tracing::debug!(field = key, "Missing numeric field, using 0");
            0.0
        }
        Some(value) => lenient_number(value).unwrap_or_else(|| {
            tracing::debug!(field = key, value = %value, "Unparseable numeric field, using 0");
            0.0
        }),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match fields.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Integer lookup that stays exact beyond 2^53, falling back to the float path.
pub(crate) fn lenient_integer(value: &Value) -> Option<i64> {
    let exact = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    exact.or_else(|| lenient_number(value).map(|n| n.trunc() as i64))
}

/// Accepts JSON numbers and numeric strings, including a comma decimal separator.
pub(crate) fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
        }
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
