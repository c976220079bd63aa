use std::fmt::Display;

use indexmap::IndexSet;
use itertools::Itertools;

use crate::error::RangeError;

/// Writes `number` as exactly `width` binary digits, most significant first.
pub fn to_binary_string(number: u64, width: usize) -> Result<String, RangeError> {
    if width < u64::BITS as usize && number >> width != 0 {
        return Err(RangeError::DoesNotFit { number, width });
    }

    Ok((0..width)
        .rev()
        .map(|bit| {
            if bit < u64::BITS as usize && (number >> bit) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect())
}

pub fn from_binary_string(bits: &str) -> Result<u64, RangeError> {
    let mut number = 0u64;

    for (offset, digit) in bits.chars().enumerate() {
        let bit = match digit {
            '0' => 0,
            '1' => 1,
            _ => return Err(RangeError::InvalidDigit { digit, offset }),
        };

        if number >> (u64::BITS - 1) != 0 {
            return Err(RangeError::TooWide {
                width: bits.chars().count(),
            });
        }

        number = (number << 1) | bit;
    }

    Ok(number)
}

/// Distinct lowercase variables in order of first appearance. The first
/// variable owns the most significant bit of a row number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet(pub IndexSet<char>);

impl VariableSet {
    pub fn collect(expression: &str) -> Self {
        VariableSet(
            expression
                .chars()
                .filter(|c| c.is_ascii_lowercase())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of rows in the full truth table, `2^V`.
    pub fn row_count(&self) -> u64 {
        1 << self.len()
    }

    pub fn bits(&self, row: u64) -> Result<String, RangeError> {
        to_binary_string(row, self.len())
    }

    /// Replaces every variable of `expression` with its bit in `row`. Any
    /// other character is copied as is.
    pub fn substitute(&self, expression: &str, row: u64) -> Result<String, RangeError> {
        let bits = self.bits(row)?.into_bytes();

        Ok(expression
            .chars()
            .map(|c| match self.0.get_index_of(&c) {
                Some(index) => bits[index] as char,
                None => c,
            })
            .collect())
    }
}

impl Display for VariableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(", "))
    }
}

pub fn count_variables(expression: &str) -> usize {
    VariableSet::collect(expression).len()
}

/// Substitutes the assignment of `row` into `expression`, taking the
/// variable order from the expression itself.
pub fn substitute(expression: &str, row: u64) -> Result<String, RangeError> {
    VariableSet::collect(expression).substitute(expression, row)
}
