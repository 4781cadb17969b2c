use std::io::{self, BufRead, Write};

use profsweep_core::{ProfileError, Remediation, RemediationPrompt};

/// Asks on the terminal what to do after repeated export failures.
/// End of input counts as abort.
pub struct TerminalPrompt;

impl RemediationPrompt for TerminalPrompt {
    fn decide(&mut self, key: &str, failures: u32, last: &ProfileError) -> Remediation {
        eprintln!("export of {key} failed {failures} times in a row");
        eprintln!("  last error: {last}");
        loop {
            let Some(line) = ask("[r]etry, [c]lear temp files and retry, [a]bort? ") else {
                return Remediation::Abort;
            };
            match parse_remediation(&line) {
                Some(r) => return r,
                None => eprintln!("please answer r, c or a"),
            }
        }
    }
}

fn ask(question: &str) -> Option<String> {
    let mut err = io::stderr().lock();
    let _ = write!(err, "{question}");
    let _ = err.flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

pub fn parse_remediation(answer: &str) -> Option<Remediation> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "r" | "retry" => Some(Remediation::Retry),
        "c" | "clear" => Some(Remediation::ClearTempAndRetry),
        "a" | "abort" => Some(Remediation::Abort),
        _ => None,
    }
}

/// `y`/`yes` confirms; anything else, including end of input, declines.
pub fn confirm(question: &str) -> bool {
    ask(&format!("{question} [y/N] "))
        .map(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_are_case_insensitive() {
        assert_eq!(parse_remediation("R\n"), Some(Remediation::Retry));
        assert_eq!(parse_remediation(" clear "), Some(Remediation::ClearTempAndRetry));
        assert_eq!(parse_remediation("ABORT"), Some(Remediation::Abort));
        assert_eq!(parse_remediation("maybe"), None);
        assert_eq!(parse_remediation(""), None);
    }
}
