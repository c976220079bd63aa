//! Infix validation and the shunting-yard transform to postfix.
//!
//! The transform is written once over a generic payload: [`compile`] carries
//! the token characters through the operator stack, [`compile_with_positions`]
//! carries their offsets in the infix text. The resulting [`PositionMap`] is
//! what lets an evaluated postfix trace be redrawn in infix layout later on.

use log::trace;

use crate::{error::ParseError, operator::Operator, stack::Stack};

fn is_operand(c: char) -> bool {
    c.is_ascii_lowercase() || c == '0' || c == '1'
}

/// Checks the infix grammar without allocating. Only ASCII whitespace is
/// skipped, so token offsets are also character offsets.
pub fn validate_infix(expression: &str) -> Result<(), ParseError> {
    let mut open = 0usize;
    let mut expecting_operand = true;
    let mut seen_token = false;

    for (offset, symbol) in expression.char_indices() {
        if symbol.is_ascii_whitespace() {
            continue;
        }
        seen_token = true;

        match symbol {
            '(' => {
                if !expecting_operand {
                    return Err(ParseError::UnexpectedOperand { symbol, offset });
                }
                open += 1;
            }
            ')' => {
                if open == 0 {
                    return Err(ParseError::UnmatchedParenthesis { offset });
                }
                if expecting_operand {
                    return Err(ParseError::UnexpectedOperator { symbol, offset });
                }
                open -= 1;
            }
            c if is_operand(c) => {
                if !expecting_operand {
                    return Err(ParseError::UnexpectedOperand { symbol, offset });
                }
                expecting_operand = false;
            }
            c => match Operator::from_symbol(c) {
                // A negation keeps the parser waiting for its operand.
                Some(Operator::Not) => {
                    if !expecting_operand {
                        return Err(ParseError::UnexpectedOperator { symbol, offset });
                    }
                }
                Some(_) => {
                    if expecting_operand {
                        return Err(ParseError::UnexpectedOperator { symbol, offset });
                    }
                    expecting_operand = true;
                }
                None => return Err(ParseError::UnknownSymbol { symbol, offset }),
            },
        }
    }

    if !seen_token {
        Err(ParseError::Empty)
    } else if open != 0 {
        Err(ParseError::UnclosedParenthesis { open })
    } else if expecting_operand {
        Err(ParseError::Incomplete)
    } else {
        Ok(())
    }
}

pub fn is_valid_infix(expression: &str) -> bool {
    validate_infix(expression).is_ok()
}

enum Pending<T> {
    Open,
    Operator(Operator, T),
}

fn shunting_yard<T>(
    expression: &str,
    payload: impl Fn(usize, char) -> T,
) -> Result<Vec<T>, ParseError> {
    validate_infix(expression)?;

    let mut output = Vec::with_capacity(expression.len());
    let mut stack = Stack::with_capacity_limit(expression.len());

    for (offset, token) in expression.char_indices() {
        if token.is_ascii_whitespace() {
            continue;
        }

        match token {
            c if is_operand(c) => output.push(payload(offset, c)),
            '(' => stack
                .push(Pending::Open)
                .map_err(|source| ParseError::Stack { source })?,
            ')' => {
                while let Ok(Pending::Operator(..)) = stack.peek() {
                    if let Ok(Pending::Operator(_, value)) = stack.pop() {
                        output.push(value);
                    }
                }
                // Discard the matching parenthesis.
                stack.pop().map_err(|source| ParseError::Stack { source })?;
            }
            c => {
                let operator = Operator::from_symbol(c).ok_or(ParseError::UnknownSymbol {
                    symbol: c,
                    offset,
                })?;

                while let Ok(&Pending::Operator(top, _)) = stack.peek() {
                    if !operator.yields_to(top) {
                        break;
                    }
                    if let Ok(Pending::Operator(_, value)) = stack.pop() {
                        output.push(value);
                    }
                }

                stack
                    .push(Pending::Operator(operator, payload(offset, c)))
                    .map_err(|source| ParseError::Stack { source })?;
            }
        }
    }

    while let Ok(pending) = stack.pop() {
        if let Pending::Operator(_, value) = pending {
            output.push(value);
        }
    }

    Ok(output)
}

/// Converts a valid infix expression to postfix. Whitespace and parentheses
/// do not survive the conversion.
pub fn compile(expression: &str) -> Result<String, ParseError> {
    let rpn = shunting_yard(expression, |_, c| c)?.into_iter().collect();
    trace!("compile({expression:?}) = {rpn:?}");

    Ok(rpn)
}

/// For each postfix token, the offset of the infix character it came from.
///
/// The map is as long as the infix text; entries past the last token are
/// unmapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMap(pub Vec<Option<usize>>);

impl PositionMap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of mapped entries, which equals the postfix token count.
    pub fn token_count(&self) -> usize {
        self.0.iter().take_while(|entry| entry.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.0.iter().copied()
    }

    fn from_offsets(offsets: Vec<usize>, infix_len: usize) -> Self {
        let mut entries = offsets.into_iter().map(Some).collect::<Vec<_>>();
        entries.resize(infix_len.max(entries.len()), None);
        PositionMap(entries)
    }
}

pub fn compile_with_positions(expression: &str) -> Result<PositionMap, ParseError> {
    let offsets = shunting_yard(expression, |offset, _| offset)?;

    Ok(PositionMap::from_offsets(offsets, expression.len()))
}

/// An infix expression together with its postfix form and position map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub infix: String,
    pub rpn: String,
    pub positions: PositionMap,
}

impl Compiled {
    pub fn new(expression: &str) -> Result<Self, ParseError> {
        let (offsets, rpn): (Vec<usize>, String) =
            shunting_yard(expression, |offset, c| (offset, c))?
                .into_iter()
                .unzip();

        Ok(Compiled {
            infix: expression.to_owned(),
            rpn,
            positions: PositionMap::from_offsets(offsets, expression.len()),
        })
    }

    pub fn infix_len(&self) -> usize {
        self.infix.len()
    }
}
