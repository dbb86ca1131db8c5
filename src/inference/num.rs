use ordered_float::OrderedFloat;
use serde_json::Number;

/// Numeric evidence: observed bounds and which literal forms appeared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumC {
    pub min: OrderedFloat<f64>,
    pub max: OrderedFloat<f64>,
    pub saw_int: bool,
    pub saw_float: bool,
}

impl NumC {
    pub fn observe(n: &Number) -> Self {
        let (value, is_int) = match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => (i as f64, true),
            (None, Some(u)) => (u as f64, true),
            _ => (n.as_f64().unwrap_or(f64::NAN), false),
        };
        let value = OrderedFloat(value);
        Self { min: value, max: value, saw_int: is_int, saw_float: !is_int }
    }

    pub(super) fn join(a: &Self, b: &Self) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
            saw_int: a.saw_int || b.saw_int,
            saw_float: a.saw_float || b.saw_float,
        }
    }

    /// Every sample was written without a fraction or exponent.
    pub fn is_integer(&self) -> bool {
        self.saw_int && !self.saw_float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: serde_json::Value) -> NumC {
        match v {
            serde_json::Value::Number(n) => NumC::observe(&n),
            other => panic!("not a number: {other}"),
        }
    }

    #[test]
    fn bounds_widen_and_floats_stick() {
        let joined = NumC::join(&num(json!(3)), &num(json!(-1.5)));
        assert_eq!(joined.min, OrderedFloat(-1.5));
        assert_eq!(joined.max, OrderedFloat(3.0));
        assert!(!joined.is_integer());
        assert!(num(json!(u64::MAX)).is_integer());
    }
}
