//! Quantity stepper bounds.

/// Default upper bound for a single cart line.
pub const DEFAULT_MAX_QUANTITY: u32 = 99;

/// Inclusive bounds enforced by quantity steppers.
///
/// The lower bound is always 1: decrementing stops at one line item and
/// removal goes through the explicit remove action instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityBounds {
    max: u32,
}

impl QuantityBounds {
    /// Smallest quantity a stepper can display.
    pub const MIN: u32 = 1;

    /// Bounds with the given maximum (values below 1 are raised to 1).
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self {
            max: if max < Self::MIN { Self::MIN } else { max },
        }
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(self) -> u32 {
        self.max
    }

    /// Bounds for a specific input: its `max` attribute wins when it parses
    /// to a positive number.
    #[must_use]
    pub fn with_input_max(self, max_attr: Option<&str>) -> Self {
        max_attr
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&m| m > 0)
            .map_or(self, Self::new)
    }

    /// Next value for a decrement click, if one is allowed.
    #[must_use]
    pub const fn step_down(self, current: u32) -> Option<u32> {
        if current > Self::MIN {
            Some(current - 1)
        } else {
            None
        }
    }

    /// Next value for an increment click, if one is allowed.
    #[must_use]
    pub const fn step_up(self, current: u32) -> Option<u32> {
        if current < self.max {
            Some(current + 1)
        } else {
            None
        }
    }

    /// Clamp a quantity into `[1, max]`.
    #[must_use]
    pub fn clamp(self, quantity: u32) -> u32 {
        quantity.clamp(Self::MIN, self.max)
    }

    /// Parse an input value the way a stepper reads it: leading digits only,
    /// and anything unparseable or zero reads as 1.
    #[must_use]
    pub fn parse_input(value: &str) -> u32 {
        parse_leading_digits(value)
            .filter(|&q| q > 0)
            .unwrap_or(Self::MIN)
    }
}

impl Default for QuantityBounds {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUANTITY)
    }
}

/// Parse the leading run of ASCII digits (after optional whitespace).
///
/// A run too long for `u32` saturates to `u32::MAX`.
#[must_use]
pub fn parse_leading_digits(value: &str) -> Option<u32> {
    let trimmed = value.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = trimmed.get(..end).filter(|d| !d.is_empty())?;
    Some(digits.parse().unwrap_or(u32::MAX))
}
