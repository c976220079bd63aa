//! Segmented, order-preserving table generation.
//!
//! A job's row range is cut into fixed-size segments. Segments are admitted
//! in ascending order, at most `workers` at a time, and rendered on a
//! dedicated rayon pool. A single writer thread puts finished segments back
//! in order before they touch the sink, and hands an admission permit back
//! every time it commits one.

use std::{
    collections::BTreeMap,
    io::Write,
    num::{NonZeroU64, NonZeroUsize},
    ops::Range,
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, Receiver, Sender},
        Condvar, Mutex, PoisonError,
    },
    thread,
};

use log::{debug, trace, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    error::{RangeError, TableError},
    operator::{FilterMode, Notation},
    render::{header, separator, RenderedSegment, RowRenderer},
};

pub const DEFAULT_SEGMENT_SIZE: u64 = 4096;

/// Upper bound on the worker count picked when none is configured.
pub const MAX_DEFAULT_WORKERS: usize = 8;

/// Written in place of the rest of the table when a row cannot be rendered.
pub const DIAGNOSTIC: &str = "Variables must be a-z lowercase.\n\
Operators are | OR; & AND; # XOR; > IMPLICATION; = IFF; - NOT\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    segment_size: NonZeroU64,
    workers: NonZeroUsize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(MAX_DEFAULT_WORKERS);

        GeneratorConfig {
            segment_size: NonZeroU64::new(DEFAULT_SEGMENT_SIZE).unwrap_or(NonZeroU64::MIN),
            workers: NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment_size(mut self, rows: NonZeroU64) -> Self {
        self.segment_size = rows;
        self
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn segment_size(&self) -> NonZeroU64 {
        self.segment_size
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }
}

/// A half-open range of row numbers, `[start, end)`. Never inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRowRange")]
pub struct RowRange {
    start: u64,
    end: u64,
}

#[derive(Deserialize)]
struct UncheckedRowRange {
    start: u64,
    end: u64,
}

impl TryFrom<UncheckedRowRange> for RowRange {
    type Error = RangeError;

    fn try_from(UncheckedRowRange { start, end }: UncheckedRowRange) -> Result<Self, Self::Error> {
        RowRange::from_bounds(start, end)
    }
}

impl RowRange {
    /// Builds a range from signed input, rejecting negative rows and a start
    /// past the end.
    pub fn new(start: i64, end: i64) -> Result<Self, RangeError> {
        let start = u64::try_from(start).map_err(|_| RangeError::NegativeRow { row: start })?;
        let end = u64::try_from(end).map_err(|_| RangeError::NegativeRow { row: end })?;

        Self::from_bounds(start, end)
    }

    pub fn from_bounds(start: u64, end: u64) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::InvertedRange { start, end });
        }

        Ok(RowRange { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn whole(rows: u64) -> Self {
        RowRange { start: 0, end: rows }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Fits the range into a table of `rows` rows. The end is clamped, a
    /// start outside the table is an error.
    pub fn clamp_to(self, rows: u64) -> Result<Range<u64>, RangeError> {
        if self.start > self.end {
            return Err(RangeError::InvertedRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.start >= rows {
            return Err(RangeError::StartBeyondTable {
                start: self.start,
                rows,
            });
        }

        Ok(self.start..self.end.min(rows))
    }
}

/// What a finished job wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: RowRange,
    pub rows_written: u64,
    pub segments: usize,
    pub workers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableJob {
    pub expression: String,
    pub notation: Notation,
    pub filter: FilterMode,
    /// `None` means the whole table.
    pub rows: Option<RowRange>,
}

impl TableJob {
    /// A job over the whole table with every row kept. The notation is
    /// detected from the expression.
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();

        TableJob {
            notation: Notation::detect(&expression),
            expression,
            filter: FilterMode::All,
            rows: None,
        }
    }

    pub fn with_notation(mut self, notation: Notation) -> Self {
        self.notation = notation;
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_rows(mut self, rows: RowRange) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Writes the table to `sink`, rows in ascending order.
    ///
    /// If the expression cannot be rendered, [`DIAGNOSTIC`] is written after
    /// whatever segments were already committed and the error is returned.
    /// Range errors are returned before anything is written.
    pub fn generate<W: Write + Send>(
        &self,
        config: &GeneratorConfig,
        sink: &mut W,
    ) -> Result<TableSummary, TableError> {
        let renderer = match RowRenderer::new(&self.expression, self.notation) {
            Ok(renderer) => renderer,
            Err(error) => {
                sink.write_all(DIAGNOSTIC.as_bytes())?;
                sink.flush()?;
                return Err(error.into());
            }
        };

        let table_rows = renderer.row_count();
        let rows = match self.rows {
            Some(range) => range.clamp_to(table_rows)?,
            None => 0..table_rows,
        };

        let segments = plan_segments(rows.clone(), config.segment_size).collect::<Vec<_>>();
        let workers = config.workers.get().min(segments.len()).max(1);
        let preamble = (rows.start == 0 && !rows.is_empty())
            .then(|| header(&self.expression) + &separator(&self.expression));

        debug!(
            "generating {:?} ({}) rows {rows:?} of {table_rows} in {} segments with {workers} workers",
            self.expression,
            self.notation,
            segments.len(),
        );

        let rows_written = if segments.is_empty() {
            0
        } else {
            run(&renderer, &segments, self.filter, workers, preamble, sink)?
        };

        Ok(TableSummary {
            rows: RowRange {
                start: rows.start,
                end: rows.end,
            },
            rows_written,
            segments: segments.len(),
            workers,
        })
    }

    /// Generates into memory. Handy for tests and small tables.
    pub fn generate_to_string(&self, config: &GeneratorConfig) -> Result<String, TableError> {
        let mut buffer = Vec::new();
        self.generate(config, &mut buffer)?;

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Contiguous segments covering `rows`; the last one may be short.
fn plan_segments(rows: Range<u64>, size: NonZeroU64) -> impl Iterator<Item = Range<u64>> {
    let size = size.get();
    let count = rows.end.saturating_sub(rows.start).div_ceil(size);

    (0..count).map(move |index| {
        let start = rows.start + index * size;
        start..start.saturating_add(size).min(rows.end)
    })
}

/// Builds a pool of `threads` threads, halving the size until the build
/// succeeds.
fn build_pool(mut threads: usize) -> Option<ThreadPool> {
    loop {
        match ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("ttable-worker-{index}"))
            .build()
        {
            Ok(pool) => return Some(pool),
            Err(error) if threads > 1 => {
                warn!("could not start {threads} workers ({error}), retrying with fewer");
                threads /= 2;
            }
            Err(error) => {
                warn!("could not start a worker pool ({error}), rendering in place");
                return None;
            }
        }
    }
}

#[derive(Debug)]
struct AdmissionState {
    permits: usize,
    closed: bool,
}

/// A counting semaphore that can be closed to wake everyone waiting on it.
#[derive(Debug)]
struct Admission {
    state: Mutex<AdmissionState>,
    available: Condvar,
}

impl Admission {
    fn new(permits: usize) -> Self {
        Admission {
            state: Mutex::new(AdmissionState {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is free. Returns `false` once closed.
    fn acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        while state.permits == 0 && !state.closed {
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.closed {
            return false;
        }

        state.permits -= 1;
        true
    }

    fn release(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .permits += 1;
        self.available.notify_one();
    }

    fn close(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
        self.available.notify_all();
    }
}

struct CloseOnDrop<'a>(&'a Admission);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

type SegmentResult = (usize, Result<RenderedSegment, TableError>);

/// Runs `compute`, turning a panic into [`TableError::WorkerPanicked`].
fn guarded<T>(
    segment: usize,
    compute: impl FnOnce() -> Result<T, TableError>,
) -> Result<T, TableError> {
    panic::catch_unwind(AssertUnwindSafe(compute))
        .unwrap_or_else(|_| Err(TableError::WorkerPanicked { segment }))
}

fn render(
    renderer: &RowRenderer,
    index: usize,
    rows: Range<u64>,
    filter: FilterMode,
) -> Result<RenderedSegment, TableError> {
    trace!("rendering segment {index} (rows {rows:?})");
    guarded(index, || renderer.render_segment(rows, filter))
}

fn run<W: Write + Send>(
    renderer: &RowRenderer,
    segments: &[Range<u64>],
    filter: FilterMode,
    workers: usize,
    preamble: Option<String>,
    sink: &mut W,
) -> Result<u64, TableError> {
    let admission = Admission::new(workers);
    let (sender, receiver) = mpsc::channel();
    let pool = build_pool(workers);

    thread::scope(|scope| {
        let admission = &admission;
        let writer = scope.spawn(move || {
            // Closes the limiter even if the sink panics.
            let _closing = CloseOnDrop(admission);
            commit_in_order(receiver, sink, admission, preamble, segments.len())
        });

        dispatch(renderer, segments, filter, pool.as_ref(), admission, sender);

        writer
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    })
}

/// Admits segments in ascending order and hands them to the pool, or renders
/// them on the calling thread when there is no pool.
fn dispatch(
    renderer: &RowRenderer,
    segments: &[Range<u64>],
    filter: FilterMode,
    pool: Option<&ThreadPool>,
    admission: &Admission,
    sender: Sender<SegmentResult>,
) {
    match pool {
        Some(pool) => pool.in_place_scope(|scope| {
            for (index, rows) in segments.iter().enumerate() {
                if !admission.acquire() {
                    debug!("admission closed before segment {index}");
                    break;
                }

                let sender = sender.clone();
                let rows = rows.clone();
                scope.spawn(move |_| {
                    sender.send((index, render(renderer, index, rows, filter))).ok();
                });
            }
        }),
        None => {
            for (index, rows) in segments.iter().enumerate() {
                if !admission.acquire() {
                    break;
                }
                let segment = render(renderer, index, rows.clone(), filter);
                if sender.send((index, segment)).is_err() {
                    break;
                }
            }
        }
    }
}

/// The only code that writes table rows to the sink.
fn commit_in_order<W: Write>(
    receiver: Receiver<SegmentResult>,
    sink: &mut W,
    admission: &Admission,
    mut preamble: Option<String>,
    total: usize,
) -> Result<u64, TableError> {
    let mut pending = BTreeMap::new();
    let mut next = 0;
    let mut rows_written = 0;

    while next < total {
        let Ok((index, segment)) = receiver.recv() else {
            // Every sender is gone but segment `next` never arrived.
            return Err(TableError::WorkerPanicked { segment: next });
        };
        pending.insert(index, segment);

        while let Some(segment) = pending.remove(&next) {
            let segment = match segment {
                Ok(segment) => segment,
                Err(error) => {
                    debug!("segment {next} failed: {error}");
                    sink.write_all(DIAGNOSTIC.as_bytes())?;
                    sink.flush()?;
                    return Err(error);
                }
            };

            if let Some(preamble) = preamble.take() {
                sink.write_all(preamble.as_bytes())?;
            }
            sink.write_all(segment.text.as_bytes())?;
            rows_written += segment.rows;

            trace!("committed segment {next} ({} rows)", segment.rows);
            next += 1;
            admission.release();
        }
    }

    sink.flush()?;

    Ok(rows_written)
}
