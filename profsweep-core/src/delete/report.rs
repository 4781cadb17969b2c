use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::delete::Outcome;
use crate::error::Result;

pub const HEADER: [&str; 4] = [
    "User",
    "Directory Deleted?",
    "Registry SID Deleted?",
    "Registry GUID Deleted?",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionRow {
    pub user: String,
    pub directory: Outcome,
    pub sid_key: Outcome,
    pub guid_key: Outcome,
}

impl DeletionRow {
    pub fn all_done(&self) -> bool {
        self.directory.succeeded() && self.sid_key.succeeded() && self.guid_key.succeeded()
    }

    pub fn cells(&self) -> [String; 4] {
        [
            clean(&self.user),
            cell(&self.directory, "Directory"),
            cell(&self.sid_key, "SID"),
            cell(&self.guid_key, "GUID"),
        ]
    }
}

fn clean(s: &str) -> String {
    s.replace(['\t', '\r', '\n'], " ")
}

fn cell(o: &Outcome, what: &str) -> String {
    match o {
        Outcome::Success => "Yes".to_string(),
        Outcome::Failed(reason) => format!("Failed: {}", clean(reason)),
        Outcome::Blank => format!("{what} is blank"),
    }
}

/// Per-user deletion outcomes, in the order they were attempted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub rows: Vec<DeletionRow>,
}

impl DeletionReport {
    /// Tab-delimited lines, header first.
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(HEADER.join("\t"))
            .chain(self.rows.iter().map(|r| r.cells().join("\t")))
            .collect()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        for line in self.lines() {
            w.write_all(line.as_bytes())?;
            w.write_all(b"\r\n")?;
        }
        w.flush()
    }

    /// Write `deletion-report-<timestamp>.tsv` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let path = dir.join(format!("deletion-report-{stamp}.tsv"));
        let f = File::create(&path)?;
        self.write_to(BufWriter::new(f))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dir: Outcome, sid: Outcome, guid: Outcome) -> DeletionRow {
        DeletionRow {
            user: "alice".into(),
            directory: dir,
            sid_key: sid,
            guid_key: guid,
        }
    }

    #[test]
    fn header_comes_first() {
        let r = DeletionReport::default();
        assert_eq!(
            r.lines(),
            vec!["User\tDirectory Deleted?\tRegistry SID Deleted?\tRegistry GUID Deleted?"]
        );
    }

    #[test]
    fn blank_guid_ends_row() {
        let r = DeletionReport {
            rows: vec![row(
                Outcome::Failed("access denied".into()),
                Outcome::Success,
                Outcome::Blank,
            )],
        };
        let lines = r.lines();
        assert_eq!(lines[1], "alice\tFailed: access denied\tYes\tGUID is blank");
        assert!(lines[1].ends_with("GUID is blank"));
    }

    #[test]
    fn reasons_cannot_break_columns() {
        let r = row(Outcome::Failed("a\tb\nc".into()), Outcome::Blank, Outcome::Blank);
        assert_eq!(r.cells()[1], "Failed: a b c");
        assert_eq!(r.cells()[2], "SID is blank");
    }

    #[test]
    fn saved_file_is_tab_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let r = DeletionReport {
            rows: vec![row(Outcome::Success, Outcome::Success, Outcome::Success)],
        };
        let p = r.save(dir.path()).unwrap();
        let text = std::fs::read_to_string(p).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "alice\tYes\tYes\tYes");
    }
}
