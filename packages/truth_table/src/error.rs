use std::io;

use derive_more::derive::{Display, Error};

use crate::stack::StackError;

/// A number or row index that does not fit where it was asked to go.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    #[display("binary representation of {number} can't fit inside {width} characters")]
    DoesNotFit { number: u64, width: usize },
    #[display("binary string of {width} digits does not fit in 64 bits")]
    TooWide { width: usize },
    #[display("invalid binary digit '{digit}' at offset {offset}")]
    InvalidDigit { digit: char, offset: usize },
    #[display("row {row} is negative")]
    NegativeRow { row: i64 },
    #[display("start row {start} is after end row {end}")]
    InvertedRange { start: u64, end: u64 },
    #[display("start row {start} is outside a table of {rows} rows")]
    StartBeyondTable { start: u64, rows: u64 },
}

/// An infix expression that is not well formed.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[display("empty expression")]
    Empty,
    #[display("unknown symbol '{symbol}' at offset {offset}")]
    UnknownSymbol { symbol: char, offset: usize },
    #[display("unexpected operand '{symbol}' at offset {offset}")]
    UnexpectedOperand { symbol: char, offset: usize },
    #[display("unexpected operator '{symbol}' at offset {offset}")]
    UnexpectedOperator { symbol: char, offset: usize },
    #[display("unmatched parenthesis at offset {offset}")]
    UnmatchedParenthesis { offset: usize },
    #[display("{open} parenthesis left open")]
    UnclosedParenthesis { open: usize },
    #[display("expression ends where an operand is expected")]
    Incomplete,
    #[display("operator stack: {source}")]
    Stack { source: StackError },
}

/// A constant postfix expression that cannot be evaluated.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    #[display("operator '{operator}' at offset {offset} is missing an operand")]
    MissingOperand { operator: char, offset: usize },
    #[display("unknown symbol '{symbol}' at offset {offset}")]
    UnknownSymbol { symbol: char, offset: usize },
    #[display("expression leaves {remaining} values on the stack instead of one")]
    UnbalancedStack { remaining: usize },
    #[display("value stack: {source}")]
    Stack { source: StackError },
}

/// A position map that disagrees with the trace it is applied to.
///
/// The compiler never produces one of these for an expression that passed
/// validation, so seeing this means the map and the trace were mismatched.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum StructuralError {
    #[display("duplicate index {index} found in map at position {position}")]
    DuplicateIndex { index: usize, position: usize },
    #[display("index {index} at position {position} is outside a map of size {size}")]
    OutOfBounds {
        index: usize,
        position: usize,
        size: usize,
    },
    #[display("map position {position} has no matching trace character")]
    TraceTooShort { position: usize },
}

#[derive(Debug, Display, Error)]
pub enum TableError {
    #[display("{_0}")]
    Range(RangeError),
    #[display("{_0}")]
    Parse(ParseError),
    #[display("{_0}")]
    Eval(EvalError),
    #[display("{_0}")]
    Structural(StructuralError),
    #[display("failed to write table: {_0}")]
    Io(io::Error),
    #[display("worker panicked while rendering segment {segment}")]
    WorkerPanicked { segment: usize },
}

impl From<RangeError> for TableError {
    fn from(error: RangeError) -> Self {
        TableError::Range(error)
    }
}

impl From<ParseError> for TableError {
    fn from(error: ParseError) -> Self {
        TableError::Parse(error)
    }
}

impl From<EvalError> for TableError {
    fn from(error: EvalError) -> Self {
        TableError::Eval(error)
    }
}

impl From<StructuralError> for TableError {
    fn from(error: StructuralError) -> Self {
        TableError::Structural(error)
    }
}

impl From<io::Error> for TableError {
    fn from(error: io::Error) -> Self {
        TableError::Io(error)
    }
}
