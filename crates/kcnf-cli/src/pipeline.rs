//! Producer/consumer threads around the interactive selector.
//!
//! The producer streams candidate lines into the selector's input channel
//! and closes it. The consumer waits on the output channel and dispatches the
//! one line it may receive. The foreground runs the selector; once it
//! returns, both workers are joined, so any dispatch has finished before
//! [`run`] returns.

use std::panic;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use kcnf_picker::PickerError;
use tracing::debug;

use crate::candidate::{Candidate, MalformedLine};
use crate::dispatch::DispatchError;
use crate::error::AppError;

/// Lines buffered between the producer and the selector.
pub const INPUT_CAPACITY: usize = 256;
/// The selector hands off at most one line and must never block doing so.
pub const OUTPUT_CAPACITY: usize = 1;

/// The interactive selection UI.
///
/// Implementations read candidate lines from `input` until it closes (or
/// until they are done), send at most one chosen line on `output`, and drop
/// both endpoints when they return.
pub trait Selector {
    fn select(&self, input: Receiver<String>, output: Sender<String>) -> Result<(), PickerError>;
}

/// Offers `candidates` (already sorted) to `selector` and dispatches the
/// selection, if any. Returns the dispatched candidate, or `None` when the
/// selection was cancelled.
pub fn run<S, D>(
    candidates: &[Candidate],
    selector: &S,
    dispatch: D,
) -> Result<Option<Candidate>, AppError>
where
    S: Selector + ?Sized,
    D: FnOnce(&Candidate) -> Result<(), DispatchError> + Send,
{
    let (input_tx, input_rx) = channel::bounded::<String>(INPUT_CAPACITY);
    let (output_tx, output_rx) = channel::bounded::<String>(OUTPUT_CAPACITY);

    thread::scope(|scope| -> Result<Option<Candidate>, AppError> {
        let producer = scope.spawn(move || {
            let mut sent = 0usize;
            for candidate in candidates {
                if input_tx.send(candidate.to_line()).is_err() {
                    debug!(sent, "selector stopped reading input");
                    return;
                }
                sent += 1;
            }
            debug!(sent, "input stream closed");
        });

        let consumer = scope.spawn(move || consume(&output_rx, candidates, dispatch));

        let selected = selector.select(input_rx, output_tx);
        debug!(ok = selected.is_ok(), "selector returned");

        join(producer);
        let dispatched = join(consumer);

        selected?;
        dispatched
    })
}

/// Dispatches the offered candidate whose line was selected. The path is
/// never rebuilt from the line, so it reaches the dispatcher byte for byte.
fn consume<D>(
    output: &Receiver<String>,
    candidates: &[Candidate],
    dispatch: D,
) -> Result<Option<Candidate>, AppError>
where
    D: FnOnce(&Candidate) -> Result<(), DispatchError>,
{
    let Ok(line) = output.recv() else {
        debug!("selection cancelled");
        return Ok(None);
    };

    Candidate::from_line(&line)?;
    let candidate = candidates
        .iter()
        .find(|candidate| candidate.to_line() == line)
        .ok_or(MalformedLine(line))?;

    dispatch(candidate)?;
    Ok(Some(candidate.clone()))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}
