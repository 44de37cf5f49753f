/// Errors raised by the growth engine. Both are precondition violations
/// detected before any state is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GrowthError {
    #[error("Cell ({row}, {col}) is outside the {height}x{width} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Rejects values outside `[0, 1]`, including NaN.
pub(crate) fn check_unit_interval(name: &'static str, value: f64) -> Result<(), GrowthError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GrowthError::InvalidParameter {
            name,
            reason: format!("must be within [0, 1], got {}", value),
        })
    }
}
