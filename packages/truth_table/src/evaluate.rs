use log::trace;

use crate::{error::EvalError, operator::Operator, stack::Stack};

/// The result of evaluating a constant postfix expression, one character per
/// input character: blanks where operands and spaces were, the intermediate
/// result where each operator was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub text: String,
    pub value: bool,
}

fn digit(value: bool) -> char {
    if value {
        '1'
    } else {
        '0'
    }
}

/// Evaluates a postfix expression made only of `0`, `1`, operators and
/// spaces.
pub fn evaluate(expression: &str) -> Result<Trace, EvalError> {
    let mut stack = Stack::with_capacity_limit(expression.len());
    let mut text = String::with_capacity(expression.len());

    for (offset, symbol) in expression.chars().enumerate() {
        match symbol {
            ' ' => text.push(' '),
            '0' | '1' => {
                stack
                    .push(symbol == '1')
                    .map_err(|source| EvalError::Stack { source })?;
                text.push(' ');
            }
            _ => {
                let operator = Operator::from_symbol(symbol)
                    .ok_or(EvalError::UnknownSymbol { symbol, offset })?;
                let missing = |_| EvalError::MissingOperand {
                    operator: symbol,
                    offset,
                };

                let result = if operator.is_unary() {
                    let operand = stack.pop().map_err(missing)?;
                    operator.apply(operand, false)
                } else {
                    let right = stack.pop().map_err(missing)?;
                    let left = stack.pop().map_err(missing)?;
                    operator.apply(left, right)
                };

                stack
                    .push(result)
                    .map_err(|source| EvalError::Stack { source })?;
                text.push(digit(result));
            }
        }
    }

    let value = match (stack.pop(), stack.is_empty()) {
        (Ok(value), true) => value,
        (Ok(_), false) => {
            return Err(EvalError::UnbalancedStack {
                remaining: stack.len() + 1,
            })
        }
        (Err(_), _) => return Err(EvalError::UnbalancedStack { remaining: 0 }),
    };

    trace!("evaluate({expression:?}) = {text:?}");

    Ok(Trace { text, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn trace_of(expression: &str) -> String {
        evaluate(expression).unwrap().text
    }

    #[test]
    fn traces_each_operator_application() {
        assert_eq!(trace_of("1 1 |"), "    1");
        assert_eq!(trace_of("1 0 &"), "    0");
        assert_eq!(trace_of("1 0 #"), "    1");
        assert_eq!(trace_of("1 1 >"), "    1");
        assert_eq!(trace_of("0 0 >"), "    1");
        assert_eq!(trace_of("1 -"), "  0");
        assert_eq!(trace_of("1 0 | 1 &"), "    1   1");
        assert_eq!(trace_of("0 1 | 0 & 1 |"), "    1   0   1");
        assert_eq!(trace_of("01&"), "  0");
        assert_eq!(trace_of("1"), " ");
    }

    #[test]
    fn implication_pops_right_operand_first() {
        assert!(!evaluate("10>").unwrap().value);
        assert!(evaluate("01>").unwrap().value);
        assert!(evaluate("00>").unwrap().value);
        assert!(evaluate("11>").unwrap().value);
    }

    #[test]
    fn value_matches_last_trace_character() {
        for expression in ["10|", "10&", "1-0=", "11#-", "0"] {
            let Trace { text, value } = evaluate(expression).unwrap();

            assert_eq!(text.len(), expression.len());
            if text.ends_with(['0', '1']) {
                assert_eq!(text.chars().last(), Some(digit(value)));
            }
        }
    }

    #[test]
    fn rejects_dangling_operands() {
        assert_eq!(
            evaluate("1 1"),
            Err(EvalError::UnbalancedStack { remaining: 2 })
        );
        assert_eq!(evaluate(""), Err(EvalError::UnbalancedStack { remaining: 0 }));
        assert_eq!(evaluate("  "), Err(EvalError::UnbalancedStack { remaining: 0 }));
    }

    #[test]
    fn rejects_unknown_symbols() {
        assert_eq!(
            evaluate("1 2 |"),
            Err(EvalError::UnknownSymbol {
                symbol: '2',
                offset: 2
            })
        );
        assert_eq!(
            evaluate("a1&"),
            Err(EvalError::UnknownSymbol {
                symbol: 'a',
                offset: 0
            })
        );
    }

    #[test]
    fn rejects_operators_without_operands() {
        assert_eq!(
            evaluate("1 |"),
            Err(EvalError::MissingOperand {
                operator: '|',
                offset: 2
            })
        );
        assert_eq!(
            evaluate("-"),
            Err(EvalError::MissingOperand {
                operator: '-',
                offset: 0
            })
        );
    }
}
