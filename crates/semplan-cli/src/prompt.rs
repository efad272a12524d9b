//! Interactive confirmation of destructive resizes.

use std::io::{self, BufRead, Write};

use semplan_core::ResizeConfirmer;
use semplan_core::plan::DestructiveResize;

/// Asks on `output` and reads the answer from `input`.
///
/// `preconfirmed` answers that many prompts with "yes" without asking
/// (`-y` once, `-yy` for both).
pub struct LineConfirmer<R, W> {
    input: R,
    output: W,
    preconfirmed: u8,
}

impl LineConfirmer<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio(preconfirmed: u8) -> Self {
        Self::new(io::stdin().lock(), io::stderr(), preconfirmed)
    }
}

impl<R: BufRead, W: Write> LineConfirmer<R, W> {
    pub fn new(input: R, output: W, preconfirmed: u8) -> Self {
        Self {
            input,
            output,
            preconfirmed,
        }
    }

    fn ask(&mut self, prompt: &str, resize: &DestructiveResize) -> io::Result<bool> {
        writeln!(self.output, "{prompt}")?;
        writeln!(
            self.output,
            "  {} course(s) placed in semester(s) {}",
            resize.affected_course_count,
            semester_list(&resize.dropped_semesters)
        )?;

        if self.preconfirmed > 0 {
            self.preconfirmed -= 1;
            writeln!(self.output, "  confirmed by -y")?;
            return Ok(true);
        }

        write!(self.output, "  Continue? [y/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}

impl<R: BufRead, W: Write> ResizeConfirmer for LineConfirmer<R, W> {
    fn confirm(&mut self, prompt: &str, resize: &DestructiveResize) -> bool {
        // An unreadable terminal never counts as consent.
        self.ask(prompt, resize).unwrap_or(false)
    }
}

fn semester_list(ids: &[u32]) -> String {
    match ids {
        [] => String::new(),
        [only] => only.to_string(),
        [first, .., last] if ids.windows(2).all(|w| w[0].checked_add(1) == Some(w[1])) => {
            format!("{first}-{last}")
        }
        _ => ids
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}
