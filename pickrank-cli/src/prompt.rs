/// Interactive terminal loop for answering pending comparisons.
///
/// One question per pending pair. `1`/`2` (or the item's exact name) picks
/// the item that should rank higher; `q` or end of input suspends. The
/// session saves after every answer, so suspending loses nothing.
use std::io::{self, BufRead, Write};

use pickrank_core::{ComparisonPair, KeyValueStore, RankError, RankingSession};

use crate::output::format_estimate;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Rank(#[from] RankError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    First,
    Second,
    Quit,
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEnd {
    /// Nothing left to ask.
    Finished,
    /// User quit with questions still pending.
    Suspended,
}

pub fn parse_answer(line: &str, pair: &ComparisonPair<String>) -> Answer {
    let trimmed = line.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "1" => return Answer::First,
        "2" => return Answer::Second,
        "q" | "quit" => return Answer::Quit,
        _ => {}
    }
    if trimmed == pair.first {
        Answer::First
    } else if trimmed == pair.second {
        Answer::Second
    } else {
        Answer::Unrecognized
    }
}

/// Ask every pending question until the run finishes or the user quits.
pub fn run_compare_loop<S, R, W>(
    session: &mut RankingSession<String, S>,
    mut input: R,
    output: &mut W,
) -> Result<LoopEnd, PromptError>
where
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    while let Some(pair) = session.current_pending_comparison().cloned() {
        writeln!(
            output,
            "\nComparison {} (estimated {})",
            session.comparisons_taken() + 1,
            format_estimate(session.estimate()),
        )?;
        writeln!(output, "  1) {}", pair.first)?;
        writeln!(output, "  2) {}", pair.second)?;
        write!(output, "Which ranks higher? [1/2, q to stop] ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(LoopEnd::Suspended);
        }

        let choice = match parse_answer(&line, &pair) {
            Answer::First => &pair.first,
            Answer::Second => &pair.second,
            Answer::Quit => return Ok(LoopEnd::Suspended),
            Answer::Unrecognized => {
                writeln!(output, "Please answer 1, 2 or q.")?;
                continue;
            }
        };

        match session.resolve(&pair, choice) {
            Ok(()) => {}
            Err(RankError::StaleResolution(detail)) => {
                tracing::warn!("ignored stale answer: {detail}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(LoopEnd::Finished)
}
