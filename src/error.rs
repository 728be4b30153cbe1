//! Validation errors for engine input.

/// Malformed settings or trades rejected before replay.
///
/// The engine never fails on well-formed input; these only guard against
/// values that would otherwise corrupt the replay (negative sizes, NaN).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("trade id must not be empty")]
    EmptyTradeId,

    #[error("trade {id}: symbol must not be empty")]
    EmptySymbol { id: String },

    #[error("trade {id}: quantity must be finite and greater than zero, got {value}")]
    InvalidQuantity { id: String, value: f64 },

    #[error("trade {id}: price must be finite and non-negative, got {value}")]
    InvalidPrice { id: String, value: f64 },

    #[error("trade {id}: fees must be finite and non-negative, got {value}")]
    InvalidFees { id: String, value: f64 },

    #[error("trade {id}: leverage factor must be finite and greater than zero, got {value}")]
    InvalidLeverage { id: String, value: f64 },

    #[error("trade {id}: total cost must be finite and at most 1e15, got {value}")]
    NotionalOutOfRange { id: String, value: f64 },

    #[error("duplicate trade id {id}")]
    DuplicateTradeId { id: String },

    #[error("setting {field} must be within [0, 1e15], got {value}")]
    InvalidSetting { field: &'static str, value: f64 },

    #[error("requirement percentage for {key} must be in (0, 1], got {value}")]
    InvalidRequirement { key: String, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", ValidationError::EmptyTradeId),
            "trade id must not be empty"
        );
        let err = ValidationError::InvalidQuantity {
            id: "t1".into(),
            value: -5.0,
        };
        assert_eq!(
            err.to_string(),
            "trade t1: quantity must be finite and greater than zero, got -5"
        );
    }

    #[test]
    fn display_notional_out_of_range() {
        let err = ValidationError::NotionalOutOfRange {
            id: "t2".into(),
            value: f64::INFINITY,
        };
        assert_eq!(
            err.to_string(),
            "trade t2: total cost must be finite and at most 1e15, got inf"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationError::EmptyTradeId);
        assert!(err.to_string().contains("trade id"));
    }
}
