use crate::model::{AttributeMap, FieldValue};

/// Parse a textual attribute as a number.
///
/// The text is trimmed, one trailing `%` is removed, and whitespace left
/// before that `%` is trimmed too, so `"65%"`, `" 65 % "` and `"65 %"` all
/// parse. Only one `%` is removed, and only from the end.
/// A percent value keeps its magnitude: `"65%"` becomes `65.0`, not `0.65`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();

    // `f64::from_str` accepts "inf" and "NaN"; the store rejects both.
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl FieldValue {
    /// Coerce to `Float` when the textual form is numeric, otherwise return
    /// the value unchanged.
    pub fn normalized(&self) -> FieldValue {
        match self {
            FieldValue::Float(v) => FieldValue::Float(*v),
            other => match parse_numeric(&other.to_string()) {
                Some(v) => FieldValue::Float(v),
                None => other.clone(),
            },
        }
    }
}

/// Coerce every value of a projected attribute map.
///
/// Applying this twice gives the same map as applying it once.
pub fn normalize(mut fields: AttributeMap) -> AttributeMap {
    normalize_in_place(&mut fields);
    fields
}

pub fn normalize_in_place(fields: &mut AttributeMap) {
    for value in fields.values_mut() {
        *value = value.normalized();
    }
}
