use std::num::{NonZeroU64, NonZeroUsize};

use indexmap::IndexSet;
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_log::test;
use truth_table::{
    binary::VariableSet, FilterMode, GeneratorConfig, Notation, RowRange, TableError, TableJob,
    DIAGNOSTIC,
};

fn config(workers: usize, segment_size: u64) -> GeneratorConfig {
    GeneratorConfig::new()
        .with_workers(NonZeroUsize::new(workers).unwrap())
        .with_segment_size(NonZeroU64::new(segment_size).unwrap())
}

#[derive(Debug)]
enum Formula {
    Variable(char),
    Constant(bool),
    Not(Box<Formula>),
    Binary(char, Box<Formula>, Box<Formula>),
}

impl Formula {
    fn random(rng: &mut StdRng, depth: u32) -> Self {
        if depth == 0 || rng.random_bool(0.25) {
            return if rng.random_bool(0.1) {
                Formula::Constant(rng.random_bool(0.5))
            } else {
                Formula::Variable((b'a' + rng.random_range(0..4u8)) as char)
            };
        }

        if rng.random_bool(0.2) {
            Formula::Not(Box::new(Formula::random(rng, depth - 1)))
        } else {
            let operator = ['&', '#', '|', '>', '='][rng.random_range(0..5)];
            Formula::Binary(
                operator,
                Box::new(Formula::random(rng, depth - 1)),
                Box::new(Formula::random(rng, depth - 1)),
            )
        }
    }

    fn infix(&self) -> String {
        match self {
            Formula::Variable(name) => name.to_string(),
            Formula::Constant(value) => (if *value { "1" } else { "0" }).to_owned(),
            Formula::Not(inner) => format!("-{}", inner.infix()),
            Formula::Binary(operator, left, right) => {
                format!("({} {operator} {})", left.infix(), right.infix())
            }
        }
    }

    fn postfix(&self) -> String {
        match self {
            Formula::Variable(_) | Formula::Constant(_) => self.infix(),
            Formula::Not(inner) => format!("{}-", inner.postfix()),
            Formula::Binary(operator, left, right) => {
                format!("{}{}{operator}", left.postfix(), right.postfix())
            }
        }
    }

    fn value(&self, variables: &IndexSet<char>, row: u64) -> bool {
        match self {
            Formula::Variable(name) => {
                let index = variables.get_index_of(name).unwrap();
                (row >> (variables.len() - 1 - index)) & 1 == 1
            }
            Formula::Constant(value) => *value,
            Formula::Not(inner) => !inner.value(variables, row),
            Formula::Binary(operator, left, right) => {
                let (left, right) = (left.value(variables, row), right.value(variables, row));
                match operator {
                    '&' => left && right,
                    '#' => left != right,
                    '|' => left || right,
                    '>' => !left || right,
                    '=' => left == right,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// Result column of every row, header and separator skipped.
fn results(table: &str) -> Vec<bool> {
    table
        .lines()
        .skip(2)
        .map(|line| line.ends_with('1'))
        .collect()
}

#[test]
fn random_formulas_match_direct_evaluation() {
    let mut rng = StdRng::seed_from_u64(0x7ab1e);

    for _ in 0..200 {
        let formula = Formula::random(&mut rng, 4);
        let infix = formula.infix();
        let postfix = formula.postfix();
        let variables = VariableSet::collect(&infix).0;
        let expected = (0..1u64 << variables.len())
            .map(|row| formula.value(&variables, row))
            .collect::<Vec<_>>();

        let workers = rng.random_range(1..=4);
        let segment_size = rng.random_range(1..=5);

        let job = TableJob::new(infix.as_str());
        assert_eq!(job.notation, Notation::Infix, "{infix:?}");
        let table = job.generate_to_string(&config(workers, segment_size)).unwrap();
        assert_eq!(results(&table), expected, "{infix:?}");

        let job = TableJob::new(postfix.as_str());
        if postfix.len() > 1 {
            assert_eq!(job.notation, Notation::Postfix, "{postfix:?}");
        }
        let table = job.generate_to_string(&config(workers, segment_size)).unwrap();
        assert_eq!(results(&table), expected, "{postfix:?}");
    }
}

#[test]
fn true_rows_are_a_subsequence_of_all_rows() {
    let test_cases = ["a|b", "(a > b) = (-b > -a)", "ab#c&", "a&-a", "a>b>c"];

    for expression in test_cases {
        let all = TableJob::new(expression)
            .generate_to_string(&config(2, 3))
            .unwrap();
        let true_rows = TableJob::new(expression)
            .with_filter(FilterMode::TrueOnly)
            .generate_to_string(&config(3, 2))
            .unwrap();

        let expected = all
            .lines()
            .enumerate()
            .filter(|(index, line)| *index < 2 || line.ends_with('1'))
            .map(|(_, line)| format!("{line}\n"))
            .collect::<String>();

        assert_eq!(true_rows, expected, "{expression:?}");
    }
}

#[test]
fn contrapositive_is_a_tautology() {
    let table = TableJob::new("(a > b) = (-b > -a)")
        .with_filter(FilterMode::TrueOnly)
        .generate_to_string(&config(4, 1))
        .unwrap();

    assert_eq!(results(&table), vec![true; 4]);
}

#[test]
fn sub_ranges_concatenate_to_the_whole_table() {
    let expression = "(a | b) & (c # -d) > e";
    let whole = TableJob::new(expression)
        .generate_to_string(&config(4, 7))
        .unwrap();

    let mut pieces = String::new();
    for (start, end) in [(0, 5), (5, 6), (6, 20), (20, 32)] {
        pieces += &TableJob::new(expression)
            .with_rows(RowRange::new(start, end).unwrap())
            .generate_to_string(&config(3, 2))
            .unwrap();
    }

    assert_eq!(pieces, whole);
}

#[test]
fn infix_and_postfix_tables_agree_on_results() {
    let test_cases = [
        ("a|b|c|d|e", "ab|c|d|e|"),
        ("a|-b&c", "ab-c&|"),
        ("(a>b)>c", "ab>c>"),
        ("a>b>c", "abc>>"),
        ("-(a=b)#c", "ab=-c#"),
    ];

    for (infix, postfix) in test_cases {
        let config = config(3, 4);
        let infix_table = TableJob::new(infix).generate_to_string(&config).unwrap();
        let postfix_table = TableJob::new(postfix).generate_to_string(&config).unwrap();

        assert_eq!(results(&infix_table), results(&postfix_table), "{infix:?}");
    }
}

#[test]
fn malformed_postfix_only_prints_the_diagnostic() {
    for expression in ["ab", "a&", "A", "ab&&", "a b"] {
        let mut sink = Vec::new();
        let error = TableJob::new(expression)
            .generate(&config(2, 1), &mut sink)
            .unwrap_err();

        assert!(matches!(error, TableError::Eval(_)), "{expression:?}: {error}");
        assert_eq!(String::from_utf8(sink).unwrap(), DIAGNOSTIC, "{expression:?}");
    }
}

#[test]
fn wide_tables_stay_in_order() {
    let expression = ('a'..='l').map(String::from).collect::<Vec<_>>().join(" # ");
    let table = TableJob::new(expression.as_str())
        .generate_to_string(&config(8, 64))
        .unwrap();

    let rows = table.lines().skip(2).collect::<Vec<_>>();
    assert_eq!(rows.len(), 1 << 12);

    for (row, line) in rows.iter().enumerate() {
        let bits = line
            .split(" : ")
            .next()
            .unwrap()
            .split(' ')
            .collect::<String>();
        assert_eq!(u64::from_str_radix(&bits, 2).unwrap(), row as u64);
        assert_eq!(line.ends_with('1'), bits.matches('1').count() % 2 == 1);
    }
}
