use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Operator {
    #[strum(to_string = "-")]
    Not,
    #[strum(to_string = "&")]
    And,
    #[strum(to_string = "#")]
    Xor,
    #[strum(to_string = "|")]
    Or,
    #[strum(to_string = ">")]
    Implies,
    #[strum(to_string = "=")]
    Iff,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Operator::Not),
            '&' => Some(Operator::And),
            '#' => Some(Operator::Xor),
            '|' => Some(Operator::Or),
            '>' => Some(Operator::Implies),
            '=' => Some(Operator::Iff),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Not => '-',
            Operator::And => '&',
            Operator::Xor => '#',
            Operator::Or => '|',
            Operator::Implies => '>',
            Operator::Iff => '=',
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::Not => 5,
            Operator::And => 4,
            Operator::Xor => 3,
            Operator::Or => 2,
            Operator::Implies => 1,
            Operator::Iff => 0,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, Operator::Not | Operator::Implies)
    }

    pub fn is_unary(self) -> bool {
        self == Operator::Not
    }

    /// Whether an operator already on the stack must be emitted before
    /// `self` is pushed.
    pub fn yields_to(self, top: Operator) -> bool {
        if self.is_right_associative() {
            self.precedence() < top.precedence()
        } else {
            self.precedence() <= top.precedence()
        }
    }

    /// Applies a binary operator. [`Operator::Not`] ignores `right`.
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            Operator::Not => !left,
            Operator::And => left && right,
            Operator::Xor => left != right,
            Operator::Or => left || right,
            Operator::Implies => !left || right,
            Operator::Iff => left == right,
        }
    }
}

/// How the expression handed to the generator is written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Notation {
    Infix,
    Postfix,
}

impl Notation {
    /// Anything that passes infix validation is infix; everything else is
    /// handed to the evaluator as postfix.
    pub fn detect(expression: &str) -> Self {
        if crate::compiler::is_valid_infix(expression) {
            Notation::Infix
        } else {
            Notation::Postfix
        }
    }
}

/// Which rows of the table are written.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    #[strum(to_string = "true")]
    #[serde(rename = "true")]
    TrueOnly,
}
