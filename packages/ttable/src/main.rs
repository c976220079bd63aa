use std::{
    fs::File,
    io::{self, BufWriter, Write},
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
};

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use colored::Colorize;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use strum::EnumString;
use truth_table::{
    FilterMode, GeneratorConfig, Notation, RowRange, TableError, TableJob, DIAGNOSTIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum NotationChoice {
    Auto,
    Infix,
    Postfix,
}

#[derive(Debug, Parser)]
#[command(name = "ttable", version)]
#[command(about = "Print the truth table of a propositional formula")]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Formula over a-z, 0 and 1, in infix (`(a | b) & -c`) or postfix
    /// (`ab|c-&`) notation.
    #[arg(allow_hyphen_values = true)]
    expression: String,

    /// Output FILE for the whole table, or START and END rows for stdout.
    #[arg(value_name = "FILE | START END", num_args = 1..=2, required = true)]
    target: Vec<String>,

    #[arg(long, default_value = "auto", value_name = "auto|infix|postfix")]
    notation: NotationChoice,

    /// Rows to keep. Defaults to `true` for a file and `all` for stdout.
    #[arg(long, value_name = "all|true")]
    filter: Option<FilterMode>,

    #[arg(long, env = "TTABLE_WORKERS")]
    workers: Option<NonZeroUsize>,

    /// Rows rendered per segment.
    #[arg(long, value_name = "ROWS")]
    segment_size: Option<NonZeroU64>,

    /// Print the selected rows as a JSON array of lines.
    #[arg(long)]
    json: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

enum Target {
    File(PathBuf),
    Rows(RowRange),
}

impl Cli {
    fn level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn target(&self) -> color_eyre::Result<Target> {
        match self.target.as_slice() {
            [file] => Ok(Target::File(PathBuf::from(file))),
            [start, end] => {
                let start = start
                    .parse::<i64>()
                    .wrap_err_with(|| format!("invalid start row {start:?}"))?;
                let end = end
                    .parse::<i64>()
                    .wrap_err_with(|| format!("invalid end row {end:?}"))?;

                Ok(Target::Rows(RowRange::new(start, end)?))
            }
            other => Err(eyre!("expected FILE or START END, got {} values", other.len())),
        }
    }

    fn config(&self) -> GeneratorConfig {
        let mut config = GeneratorConfig::default();
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(segment_size) = self.segment_size {
            config = config.with_segment_size(segment_size);
        }
        config
    }

    fn job(&self, filter: FilterMode) -> TableJob {
        let job = TableJob::new(self.expression.as_str()).with_filter(self.filter.unwrap_or(filter));

        match self.notation {
            NotationChoice::Auto => job,
            NotationChoice::Infix => job.with_notation(Notation::Infix),
            NotationChoice::Postfix => job.with_notation(Notation::Postfix),
        }
    }
}

/// Errors that leave the diagnostic in the output.
fn is_malformed(error: &TableError) -> bool {
    !matches!(error, TableError::Range(_) | TableError::Io(_))
}

fn write_file(cli: &Cli, path: PathBuf) -> color_eyre::Result<()> {
    let job = cli.job(FilterMode::TrueOnly);
    let file = File::create(&path).wrap_err_with(|| format!("cannot create {}", path.display()))?;
    let mut sink = BufWriter::new(file);

    match job.generate(&cli.config(), &mut sink) {
        Ok(summary) => {
            info!(
                "wrote {} of {} rows to {} ({} notation)",
                summary.rows_written,
                summary.rows.end(),
                path.display(),
                job.notation,
            );
            Ok(())
        }
        Err(error) => {
            if is_malformed(&error) {
                eprint!("{}", DIAGNOSTIC.red());
            }
            Err(error).wrap_err_with(|| format!("failed to write {}", path.display()))
        }
    }
}

fn write_rows(cli: &Cli, rows: RowRange) -> color_eyre::Result<()> {
    let job = cli.job(FilterMode::All).with_rows(rows);
    let config = cli.config();

    if !cli.json {
        let mut sink = BufWriter::new(io::stdout());
        let summary = job.generate(&config, &mut sink)?;
        info!("wrote {} rows", summary.rows_written);
        return Ok(());
    }

    let mut buffer = Vec::new();
    let result = job.generate(&config, &mut buffer);
    if let Err(TableError::Range(error)) = &result {
        return Err((*error).into());
    }

    let text = String::from_utf8_lossy(&buffer);
    let lines = text.lines().collect::<Vec<_>>();
    let mut stdout = io::stdout();
    serde_json::to_writer_pretty(&mut stdout, &lines)?;
    writeln!(stdout)?;

    result?;
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    TermLogger::init(
        cli.level(),
        ConfigBuilder::new().set_time_level(LevelFilter::Off).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    match cli.target()? {
        Target::File(path) => write_file(&cli, path),
        Target::Rows(rows) => write_rows(&cli, rows),
    }
}
