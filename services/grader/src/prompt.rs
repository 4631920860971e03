//! Terminal decision point for answer key discrepancies.

use exam_grading::grading::{Discrepancy, DiscrepancyResolver, Resolution};
use std::io::{self, BufRead, Write};
use tracing::warn;

/// Asks the operator whether to patch each discrepancy. Anything other than
/// an explicit yes, including end of input, aborts the run.
pub(crate) struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub(crate) fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, discrepancy: &Discrepancy) -> io::Result<Resolution> {
        writeln!(self.output, "\nAnswer key discrepancy")?;
        writeln!(self.output, "- {discrepancy}")?;
        write!(
            self.output,
            "==> Patch the sheet so Q{} uses '{}'? (y/N) ",
            discrepancy.position, discrepancy.declared
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Resolution::Abort);
        }

        Ok(parse_decision(&line))
    }
}

impl<R: BufRead, W: Write> DiscrepancyResolver for TerminalPrompt<R, W> {
    fn resolve(&mut self, discrepancy: &Discrepancy) -> Resolution {
        match self.ask(discrepancy) {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(error = %err, "could not read decision, aborting");
                Resolution::Abort
            }
        }
    }
}

fn parse_decision(raw: &str) -> Resolution {
    match raw.trim().to_lowercase().as_str() {
        "s" | "sim" | "y" | "yes" => Resolution::Patch,
        _ => Resolution::Abort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_grading::grading::QuestionId;
    use std::io::Cursor;

    fn discrepancy() -> Discrepancy {
        Discrepancy {
            position: 4,
            question_id: QuestionId::parse("204"),
            recorded: "b".to_string(),
            declared: "d".to_string(),
            recorded_values: vec!["b".to_string()],
            mismatched: true,
            inconsistent: false,
        }
    }

    #[test]
    fn accepts_yes_in_either_language() {
        for answer in ["s\n", "Sim\n", "y\n", " YES \n"] {
            let mut prompt = TerminalPrompt::new(Cursor::new(answer), Vec::new());
            assert_eq!(prompt.resolve(&discrepancy()), Resolution::Patch, "{answer:?}");
        }
    }

    #[test]
    fn anything_else_aborts() {
        for answer in ["\n", "n\n", "nao\n", ""] {
            let mut prompt = TerminalPrompt::new(Cursor::new(answer), Vec::new());
            assert_eq!(prompt.resolve(&discrepancy()), Resolution::Abort, "{answer:?}");
        }
    }

    #[test]
    fn reports_discrepancy_before_asking() {
        let mut output = Vec::new();
        TerminalPrompt::new(Cursor::new("y\n"), &mut output).resolve(&discrepancy());
        let text = String::from_utf8(output).expect("utf8");

        assert!(text.contains("Q4 (id 204)"));
        assert!(text.contains("'b'"));
        assert!(text.contains("Q4 uses 'd'"));
    }
}
