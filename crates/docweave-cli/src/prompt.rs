use docweave_engine::AmbiguityResolver;
use std::io::{self, BufRead, IsTerminal, Write};

/// Asks the operator to pick a candidate by number; empty input or `S` skips.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, subject: &str, candidates: &[String]) -> io::Result<Option<usize>> {
        writeln!(self.output, "\tChoose the correct target for {subject} or S to skip:")?;
        for (index, candidate) in candidates.iter().enumerate() {
            writeln!(self.output, "\t{index}) {candidate}")?;
        }
        writeln!(self.output, "\tS) Skip and leave this reference unchanged")?;

        loop {
            write!(self.output, "\tEnter selection [S]: ")?;
            self.output.flush()?;
            let mut response = String::new();
            if self.input.read_line(&mut response)? == 0 {
                return Ok(None);
            }
            let response = response.trim();
            if response.is_empty() || response.eq_ignore_ascii_case("s") {
                return Ok(None);
            }
            match response.parse::<usize>() {
                Ok(index) if index < candidates.len() => return Ok(Some(index)),
                _ => writeln!(self.output, "\tNot a valid selection: {response}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> AmbiguityResolver for PromptResolver<R, W> {
    fn choose(&mut self, subject: &str, candidates: &[String]) -> Option<usize> {
        match self.ask(subject, candidates) {
            Ok(choice) => choice,
            Err(e) => {
                log::warn!("Prompt failed, skipping {subject}: {e}");
                None
            }
        }
    }
}

/// Prompt on the terminal when stdin is one, otherwise skip every choice
pub enum TerminalResolver {
    Prompt(PromptResolver<io::StdinLock<'static>, io::Stderr>),
    Skip,
}

impl TerminalResolver {
    pub fn new(allow_prompt: bool) -> Self {
        let stdin = io::stdin();
        if allow_prompt && stdin.is_terminal() {
            TerminalResolver::Prompt(PromptResolver::new(stdin.lock(), io::stderr()))
        } else {
            TerminalResolver::Skip
        }
    }
}

impl AmbiguityResolver for TerminalResolver {
    fn choose(&mut self, subject: &str, candidates: &[String]) -> Option<usize> {
        match self {
            TerminalResolver::Prompt(prompt) => prompt.choose(subject, candidates),
            TerminalResolver::Skip => {
                log::warn!("Ambiguous choice for {subject} skipped: {}", candidates.join(", "));
                None
            }
        }
    }
}
