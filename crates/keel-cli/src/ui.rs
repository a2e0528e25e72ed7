//! Terminal output: framed message blocks and confirmation prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::bail;
use colored::{ColoredString, Colorize};
use keel_plan::{Finding, Severity};

const LINE_INITIAL: &str = "\u{250C}";
const LINE_MIDDLE: &str = "\u{2502}";
const LINE_FINAL: &str = "\u{2514}";

/// Indentation of section lines below their title.
const SECTION_INDENT: usize = 2;

enum Content {
    /// Title followed by text on the same line.
    Line { title: String, text: String },
    /// Title followed by indented lines; omitted when there are none.
    Section { title: String, lines: Vec<String> },
}

/// A framed block of titled content.
pub struct Block {
    severity: Severity,
    contents: Vec<Content>,
}

impl Block {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            contents: Vec::new(),
        }
    }

    pub fn line(mut self, title: &str, text: &str) -> Self {
        self.contents.push(Content::Line {
            title: title.into(),
            text: text.into(),
        });
        self
    }

    /// Multi-line entries are split so each line gets its own frame prefix.
    pub fn section<S: AsRef<str>>(mut self, title: &str, lines: &[S]) -> Self {
        self.contents.push(Content::Section {
            title: title.into(),
            lines: lines
                .iter()
                .flat_map(|l| l.as_ref().lines().map(str::to_string).collect::<Vec<_>>())
                .collect(),
        });
        self
    }

    pub fn render(&self, color: bool) -> String {
        let paint = |s: &str| -> String {
            if !color {
                return s.to_string();
            }
            let painted: ColoredString = match self.severity {
                Severity::Error => s.red(),
                Severity::Warning => s.yellow(),
            };
            painted.to_string()
        };

        let prefix = paint(&format!("{LINE_MIDDLE} "));
        let indent = " ".repeat(SECTION_INDENT);
        let mut lines = Vec::new();

        for content in &self.contents {
            match content {
                Content::Line { title, text } => {
                    lines.push(format!("{prefix}{} {text}", paint(title)));
                }
                Content::Section { lines: body, .. } if body.is_empty() => {}
                Content::Section { title, lines: body } => {
                    lines.push(format!("{prefix}{}", paint(title)));
                    lines.extend(body.iter().map(|l| format!("{prefix}{indent}{l}")));
                }
            }
        }

        if lines.is_empty() {
            return String::new();
        }

        lines.insert(0, paint(LINE_INITIAL));
        lines.push(paint(LINE_FINAL));
        lines.join("\n")
    }
}

impl From<&Finding> for Block {
    fn from(finding: &Finding) -> Self {
        let (kind, title, label) = match finding.severity {
            Severity::Error => ("Error type:", "Invalid Configuration Change", "Error:"),
            Severity::Warning => ("Warning type:", "Dangerous Configuration Change", "Warning:"),
        };

        Block::new(finding.severity)
            .line(kind, title)
            .section("Config path:", &finding.paths)
            .section(label, &[finding.message.as_str()])
    }
}

/// Ask for confirmation on the terminal. Input that is not a terminal is
/// taken as approval.
pub fn confirm() -> anyhow::Result<()> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(());
    }
    ask("Would you like to continue?", &mut stdin.lock(), &mut io::stdout())
}

/// Repeat the question until the answer is yes or no.
pub fn ask(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> anyhow::Result<()> {
    loop {
        write!(output, "\n{question} (yes/no) ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            bail!("ask: unexpected end of input");
        }

        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(()),
            "n" | "no" => bail!("User aborted..."),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn finding(severity: Severity, message: &str, paths: &[&str]) -> Finding {
        Finding {
            severity,
            message: message.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn renders_error_block() {
        let f = finding(
            Severity::Error,
            "Change is not allowed.",
            &["cluster.network.mode", "cluster.network.cidr"],
        );
        let expected = [
            "┌",
            "│ Error type: Invalid Configuration Change",
            "│ Config path:",
            "│   cluster.network.mode",
            "│   cluster.network.cidr",
            "│ Error:",
            "│   Change is not allowed.",
            "└",
        ]
        .join("\n");
        assert_eq!(Block::from(&f).render(false), expected);
    }

    #[test]
    fn renders_multi_line_warning() {
        let f = finding(Severity::Warning, "first\nsecond", &["hosts.a.mainResourcePoolPath"]);
        let out = Block::from(&f).render(false);
        assert!(out.starts_with("┌\n│ Warning type: Dangerous Configuration Change\n"));
        assert!(out.contains("│ Warning:\n│   first\n│   second\n└"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let f = finding(Severity::Error, "boom", &[]);
        let out = Block::from(&f).render(false);
        assert!(!out.contains("Config path:"));
        assert!(out.contains("│ Error:"));
        assert_eq!(Block::new(Severity::Error).render(false), "");
    }

    #[test]
    fn ask_accepts_yes_after_retry() {
        let mut input = Cursor::new("maybe\nYES\n");
        let mut output = Vec::new();
        ask("Continue?", &mut input, &mut output).unwrap();

        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Continue? (yes/no)").count(), 2);
    }

    #[test]
    fn ask_rejects_no_and_eof() {
        let err = ask("Continue?", &mut Cursor::new("n\n"), &mut Vec::<u8>::new()).unwrap_err();
        assert_eq!(err.to_string(), "User aborted...");

        let err = ask("Continue?", &mut Cursor::new(""), &mut Vec::<u8>::new()).unwrap_err();
        assert!(err.to_string().starts_with("ask:"));
    }
}
