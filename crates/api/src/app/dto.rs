use serde::{Deserialize, Deserializer};
use serde_json::Value;

use peerpay_core::AccountId;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /transfer`.
///
/// Fields are kept as raw JSON so that numeric strings (`"200"`) are
/// accepted and anything else reaches validation instead of failing
/// deserialization with a generic 422.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferBody {
    #[serde(default, deserialize_with = "present")]
    pub sender_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub receiver_id: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub amount: Option<Value>,
}

impl TransferBody {
    pub fn sender(&self) -> Option<AccountId> {
        as_account_id(self.sender_id.as_ref())
    }

    pub fn receiver(&self) -> Option<AccountId> {
        as_account_id(self.receiver_id.as_ref())
    }

    /// Amount in major units; NaN when the field is missing or not numeric.
    pub fn amount(&self) -> f64 {
        coerce_number(self.amount.as_ref())
    }
}

// A field that is present but `null` must stay distinguishable from a
// missing one, which plain `Option<Value>` collapses.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Numeric coercion for loosely typed JSON input.
///
/// Numbers pass through, strings are parsed after trimming (blank is zero),
/// booleans and null become 1/0, everything else is NaN.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Array(_) | Value::Object(_)) => f64::NAN,
    }
}

/// An id is usable only if it coerces to an integral number in range.
fn as_account_id(value: Option<&Value>) -> Option<AccountId> {
    if let Some(Value::Number(n)) = value {
        if let Some(id) = n.as_i64() {
            return Some(AccountId::new(id));
        }
    }
    let n = coerce_number(value);
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(AccountId::new(n as i64))
    } else {
        None
    }
}
