use std::ops::Range;

use crate::{
    binary::VariableSet,
    compiler::Compiled,
    error::{ParseError, TableError},
    evaluate::{evaluate, Trace},
    operator::{FilterMode, Notation},
    reconstruct::reconstruct_infix,
};

/// `v1 v2 … vV : <expression> : Result`
pub fn header(expression: &str) -> String {
    let names = VariableSet::collect(expression)
        .0
        .iter()
        .map(|variable| format!("{variable} "))
        .collect::<String>();

    format!("{names}: {expression} : Result\n")
}

/// A rule of `=` as wide as the header.
pub fn separator(expression: &str) -> String {
    let width = 2 * VariableSet::collect(expression).len() + expression.chars().count() + 11;

    format!("{}\n", "=".repeat(width))
}

#[derive(Debug, Clone)]
enum Layout {
    Postfix,
    Infix(Compiled),
}

/// Renders truth table rows for one expression.
///
/// Everything that does not depend on the row (variable order, postfix form,
/// position map) is computed once here and shared by every row.
#[derive(Debug, Clone)]
pub struct RowRenderer {
    expression: String,
    variables: VariableSet,
    layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub value: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSegment {
    pub text: String,
    pub rows: u64,
}

impl RowRenderer {
    pub fn new(expression: &str, notation: Notation) -> Result<Self, ParseError> {
        let layout = match notation {
            Notation::Postfix => Layout::Postfix,
            Notation::Infix => Layout::Infix(Compiled::new(expression)?),
        };

        Ok(RowRenderer {
            expression: expression.to_owned(),
            variables: VariableSet::collect(expression),
            layout,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn notation(&self) -> Notation {
        match self.layout {
            Layout::Postfix => Notation::Postfix,
            Layout::Infix(_) => Notation::Infix,
        }
    }

    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn row_count(&self) -> u64 {
        self.variables.row_count()
    }

    pub fn header(&self) -> String {
        header(&self.expression)
    }

    pub fn separator(&self) -> String {
        separator(&self.expression)
    }

    fn postfix(&self) -> &str {
        match &self.layout {
            Layout::Postfix => &self.expression,
            Layout::Infix(compiled) => &compiled.rpn,
        }
    }

    /// Appends the line for `row` to `line` and returns the row's value.
    pub fn write_row(&self, row: u64, line: &mut String) -> Result<bool, TableError> {
        let bits = self.variables.bits(row)?;
        let postfix = self.postfix();
        let constant = self.variables.substitute(postfix, row)?;
        let Trace { text, value } = evaluate(&constant)?;

        for bit in bits.chars() {
            line.push(bit);
            line.push(' ');
        }
        line.push_str(": ");

        // A lone operand has no operator to trace.
        if postfix.chars().count() == 1 {
            line.push_str("  :   ");
        } else {
            match &self.layout {
                Layout::Postfix => line.push_str(&text),
                Layout::Infix(compiled) => line.push_str(&reconstruct_infix(
                    &compiled.positions,
                    &text,
                    compiled.infix_len(),
                )?),
            }
            line.push_str(" :   ");
        }

        line.push(if value { '1' } else { '0' });
        line.push('\n');

        Ok(value)
    }

    pub fn render_row(&self, row: u64) -> Result<Row, TableError> {
        let mut text = String::new();
        let value = self.write_row(row, &mut text)?;

        Ok(Row { text, value })
    }

    /// Renders rows `[rows.start, rows.end)`, keeping only true rows when
    /// asked to.
    pub fn render_segment(
        &self,
        rows: Range<u64>,
        filter: FilterMode,
    ) -> Result<RenderedSegment, TableError> {
        let mut segment = RenderedSegment::default();
        let mut line = String::new();

        for row in rows {
            line.clear();
            let value = self.write_row(row, &mut line)?;

            if value || filter == FilterMode::All {
                segment.text.push_str(&line);
                segment.rows += 1;
            }
        }

        Ok(segment)
    }
}
