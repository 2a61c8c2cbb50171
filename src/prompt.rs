//! Operator prompts
//!
//! Every question the tool can ask goes through [`Prompter`], which reads
//! from any `BufRead` and writes to any `Write` so tests can script the
//! answers. Invalid answers are re-asked; end of input aborts the run.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::{IgvError, Result};
use crate::prefs::Preferences;
use crate::runner::CaptureMode;
use crate::table::TargetTable;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn answer(&mut self, marker: &str) -> Result<String> {
        write!(self.output, "{}", marker)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(IgvError::Aborted {
                reason: "no answer on standard input".to_string(),
            });
        }
        Ok(line.trim().to_string())
    }

    pub fn yes_no(&mut self, question: &str) -> Result<bool> {
        loop {
            writeln!(self.output, "{} (Y/N)", question)?;
            match self.answer(">>")?.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Invalid response.")?,
            }
        }
    }

    pub fn ask_nonempty(&mut self, question: &str, missing: &str) -> Result<String> {
        loop {
            writeln!(self.output, "{}", question)?;
            let answer = self.answer(">>>")?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say(missing)?;
        }
    }

    pub fn ask_port(&mut self) -> Result<u16> {
        loop {
            writeln!(self.output, "Please enter a port number to use with IGV")?;
            match self.answer(">>>")?.parse::<u16>() {
                Ok(port) if port > 0 => return Ok(port),
                _ => self.say("Port number must be an integer from 1 to 65535.")?,
            }
        }
    }

    /// 1 grouped, 2 single, 3 both
    pub fn capture_mode(&mut self) -> Result<CaptureMode> {
        self.say(
            "\nAt least one line has multiple BAM files listed.\n\
             How would you like your snapshots?\n\
             \t1. All files at once for the line.\n\
             \t2. One file at a time at each locus.\n\
             \t3. Both.",
        )?;
        loop {
            match CaptureMode::from_choice(&self.answer(">>")?) {
                Some(mode) => return Ok(mode),
                None => self.say("Invalid response.")?,
            }
        }
    }

    /// Walk the operator through each value, offering the default first
    pub fn create_preferences(&mut self) -> Result<Preferences> {
        let mut prefs = Preferences::default();
        self.say("Creating default preferences file:")?;

        if !self.yes_no(&format!("Default host = {}", prefs.host))? {
            prefs.host = self.ask_nonempty(
                "Please enter host identifier or IP address",
                "Host name required.",
            )?;
        }
        if !self.yes_no(&format!("Default port = {}", prefs.port))? {
            prefs.port = self.ask_port()?;
        }
        if !self.yes_no(&format!("Default genome = {}", prefs.genome))? {
            prefs.genome =
                self.ask_nonempty("Please enter a genome to use", "Genome name required.")?;
        }
        if !self.yes_no(&format!(
            "Default directory = {}",
            prefs.default_directory.display()
        ))? {
            prefs.default_directory = self
                .ask_nonempty(
                    "Please enter a default directory for output",
                    "Default directory required.",
                )?
                .into();
        }
        Ok(prefs)
    }
}

/// Tables without any multi-file line always image one file at a time.
/// Otherwise the command-line choice wins, and the operator is asked last.
pub fn choose_capture_mode<R: BufRead, W: Write>(
    table: &TargetTable,
    requested: Option<CaptureMode>,
    prompter: &mut Prompter<R, W>,
) -> Result<CaptureMode> {
    if !table.has_multi_file_line() {
        return Ok(CaptureMode::Single);
    }
    match requested {
        Some(mode) => Ok(mode),
        None => prompter.capture_mode(),
    }
}
