//! Per-kind conversion between wire values, display text and user input.
//!
//! [`display_text`] is pure and total; [`wire_from_user`] validates and may
//! fail, and a failing value is rejected rather than coerced.

use thiserror::Error;

use crate::item::{BooleanNaming, ItemData, MenuItem, TextEditMode};

/// A user-supplied value failed a kind-specific conversion rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The value could not be parsed as a number.
    #[error("not a number: {0:?}")]
    NotNumeric(String),

    /// A numeric value fell outside the item's accepted range.
    #[error("value {value} outside range 0..={max}")]
    OutOfRange {
        /// Raw wire value after scaling.
        value: i64,
        /// Largest accepted wire value.
        max: i64,
    },

    /// An enum index fell outside the choice list.
    #[error("choice index {index} outside 0..{count}")]
    BadIndex {
        /// Requested index.
        index: i64,
        /// Number of choices.
        count: usize,
    },

    /// A negative value was given to an item that forbids them.
    #[error("negative values not allowed")]
    NegativeNotAllowed,

    /// Text did not match the pattern required by its edit mode.
    #[error("{0:?} does not match the {1} format")]
    PatternMismatch(String, &'static str),

    /// Text longer than the device accepts.
    #[error("text length {len} exceeds limit {max}")]
    TooLong {
        /// Supplied length in characters.
        len: usize,
        /// Device-side buffer limit.
        max: u32,
    },

    /// The item kind has no user-editable wire value.
    #[error("{0} items are not editable")]
    NotEditable(&'static str),
}

/// Render an item's current value as display text.
pub fn display_text(item: &MenuItem) -> String {
    match &item.data {
        ItemData::SubMenu { .. } | ItemData::Action | ItemData::List { .. } => String::new(),
        ItemData::Analog { value, offset, divisor, unit_name, .. } => {
            format_analog(*value, *offset, *divisor, unit_name)
        }
        ItemData::Enum { value, choices } => choices
            .get(usize::try_from(*value).unwrap_or(usize::MAX))
            .cloned()
            .unwrap_or_default(),
        ItemData::Boolean { value, naming } => match (naming, value) {
            (BooleanNaming::OnOff, true) => "ON".to_string(),
            (BooleanNaming::OnOff, false) => "OFF".to_string(),
            (BooleanNaming::YesNo, true) => "YES".to_string(),
            (BooleanNaming::YesNo, false) => "NO".to_string(),
            (BooleanNaming::TrueFalse, true) => "TRUE".to_string(),
            (BooleanNaming::TrueFalse, false) => "FALSE".to_string(),
        },
        ItemData::Float { value, decimal_places } => {
            format!("{:.*}", *decimal_places as usize, value)
        }
        ItemData::LargeNumber { value, decimal_places, .. } => {
            format!("{:.*}", *decimal_places as usize, value)
        }
        ItemData::Rgb { value, .. } => value.clone(),
        ItemData::ScrollChoice { value, .. } => value.text.clone(),
        ItemData::Text { value, .. } => value.clone(),
    }
}

/// Convert user input into the wire value for an item, validating per kind.
pub fn wire_from_user(item: &MenuItem, input: &str) -> Result<String, ValueError> {
    let input = input.trim();
    match &item.data {
        ItemData::Analog { max_value, offset, divisor, unit_name, .. } => {
            // Users frequently leave the unit suffix in place when editing.
            let bare = input.strip_suffix(unit_name.as_str()).unwrap_or(input).trim();
            let display: f64 = bare
                .parse()
                .map_err(|_| ValueError::NotNumeric(input.to_string()))?;
            let wire = (display * *divisor as f64 - *offset as f64).round() as i64;
            if wire < 0 || wire > *max_value {
                return Err(ValueError::OutOfRange { value: wire, max: *max_value });
            }
            Ok(wire.to_string())
        }
        ItemData::Enum { choices, .. } => {
            let index: i64 = input
                .parse()
                .map_err(|_| ValueError::NotNumeric(input.to_string()))?;
            if index < 0 || index as usize >= choices.len() {
                return Err(ValueError::BadIndex { index, count: choices.len() });
            }
            Ok(index.to_string())
        }
        ItemData::Boolean { .. } => {
            let truthy = matches!(input.chars().next(), Some('Y' | 'y' | 'T' | 't' | '1'));
            Ok(if truthy { "1" } else { "0" }.to_string())
        }
        ItemData::Float { decimal_places, .. } => {
            let value: f64 = input
                .parse()
                .map_err(|_| ValueError::NotNumeric(input.to_string()))?;
            Ok(format!("{:.*}", *decimal_places as usize, value))
        }
        ItemData::LargeNumber { decimal_places, negative_allowed, .. } => {
            let value: f64 = input
                .parse()
                .map_err(|_| ValueError::NotNumeric(input.to_string()))?;
            if value < 0.0 && !negative_allowed {
                return Err(ValueError::NegativeNotAllowed);
            }
            Ok(format!("{:.*}", *decimal_places as usize, value))
        }
        ItemData::Text { max_length, edit_mode, .. } => {
            validate_text(input, *max_length, *edit_mode)?;
            Ok(input.to_string())
        }
        ItemData::Rgb { .. } => {
            if is_hex_colour(input) {
                Ok(input.to_string())
            } else {
                Err(ValueError::PatternMismatch(input.to_string(), "#rrggbb colour"))
            }
        }
        ItemData::ScrollChoice { value, .. } => {
            // The label never travels back; an absolute set is position only.
            let position: i32 = input
                .parse()
                .unwrap_or_else(|_| value.position);
            Ok(format!("{position}-"))
        }
        ItemData::SubMenu { .. } => Err(ValueError::NotEditable("SubMenu")),
        ItemData::Action => Err(ValueError::NotEditable("Action")),
        ItemData::List { .. } => Err(ValueError::NotEditable("List")),
    }
}

/// Fraction scale matching the divisor break points.
fn fraction_scale(divisor: i64) -> i64 {
    if divisor > 1000 {
        10000
    } else if divisor > 100 {
        1000
    } else if divisor > 10 {
        100
    } else {
        10
    }
}

/// Fractional digit count derived from the divisor magnitude.
fn fraction_digits(divisor: i64) -> usize {
    if divisor <= 10 {
        1
    } else if divisor <= 100 {
        2
    } else if divisor <= 1000 {
        3
    } else {
        4
    }
}

fn format_analog(value: i64, offset: i64, divisor: i64, unit: &str) -> String {
    let calc = value + offset;
    if divisor < 2 {
        return format!("{calc}{unit}");
    }
    let whole = calc / divisor;
    let scale = fraction_scale(divisor);
    let fraction = ((calc % divisor).abs() as f64 * (scale as f64 / divisor as f64)).round() as i64;
    format!("{whole}.{fraction:0>width$}{unit}", width = fraction_digits(divisor))
}

fn is_hex_colour(text: &str) -> bool {
    let Some(rest) = text.strip_prefix('#') else {
        return false;
    };
    (rest.len() == 6 || rest.len() == 8) && rest.chars().all(|c| c.is_ascii_hexdigit())
}

fn validate_text(text: &str, max_length: u32, mode: TextEditMode) -> Result<(), ValueError> {
    match mode {
        TextEditMode::PlainText => {
            // The device buffer reserves one slot for the terminator.
            let len = text.chars().count();
            if len >= max_length as usize {
                return Err(ValueError::TooLong { len, max: max_length });
            }
            Ok(())
        }
        TextEditMode::IpAddress => {
            let quad_ok = text.split('.').count() == 4
                && text.split('.').all(|seg| seg.parse::<u8>().is_ok());
            if quad_ok {
                Ok(())
            } else {
                Err(ValueError::PatternMismatch(text.to_string(), "IPv4 address"))
            }
        }
        TextEditMode::GregorianDate => {
            let date_ok = text.split('/').count() == 3
                && text
                    .split('/')
                    .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()));
            if date_ok {
                Ok(())
            } else {
                Err(ValueError::PatternMismatch(text.to_string(), "D/M/Y date"))
            }
        }
        // All time and duration variants travel as HH:MM:SS[.fraction].
        _ => {
            if is_time_text(text) {
                Ok(())
            } else {
                Err(ValueError::PatternMismatch(text.to_string(), "HH:MM:SS time"))
            }
        }
    }
}

fn is_time_text(text: &str) -> bool {
    let mut parts = text.splitn(3, ':');
    let (Some(h), Some(m), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits(h) || !digits(m) {
        return false;
    }
    match rest.split_once('.') {
        Some((secs, frac)) => digits(secs) && frac.chars().all(|c| c.is_ascii_digit()),
        None => digits(rest),
    }
}
