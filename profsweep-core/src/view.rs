use crate::domain::{DirSize, EditableState, ProfileRecord};

/// How a column's cells are rendered and aligned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Bytes,
    Flag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    User,
    LastUpdated,
    Size,
    State,
    Sid,
    Guid,
    Delete,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::User,
        Column::LastUpdated,
        Column::Size,
        Column::State,
        Column::Sid,
        Column::Guid,
        Column::Delete,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            Column::User => "User",
            Column::LastUpdated => "Last Updated",
            Column::Size => "Size",
            Column::State => "State",
            Column::Sid => "SID",
            Column::Guid => "GUID",
            Column::Delete => "Delete?",
        }
    }

    pub const fn kind(self) -> ColumnKind {
        match self {
            Column::Size => ColumnKind::Bytes,
            Column::Delete => ColumnKind::Flag,
            _ => ColumnKind::Text,
        }
    }

    pub fn cell(self, rec: &ProfileRecord) -> String {
        match self {
            Column::User => rec.name.clone(),
            Column::LastUpdated => rec.last_updated.clone(),
            Column::Size => match rec.size {
                DirSize::NotChecked => String::new(),
                DirSize::Bytes(n) => human_bytes(n),
                DirSize::CouldNotCalculate => "Could not calculate".into(),
            },
            Column::State => match rec.editable {
                EditableState::Unknown => String::new(),
                EditableState::Editable => "Editable".into(),
                EditableState::Uneditable => "Uneditable".into(),
            },
            Column::Sid => rec.sid.clone().unwrap_or_default(),
            Column::Guid => rec.guid.clone().unwrap_or_default(),
            Column::Delete => if rec.marked_for_delete { "x" } else { "" }.into(),
        }
    }
}

/// Binary-prefixed size with one decimal, e.g. `1.5 MiB`.
pub fn human_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if n < 1024 {
        return format!("{n} B");
    }
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    format!("{v:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_humanized() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1536), "1.5 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn unchecked_size_is_blank_not_zero() {
        let mut rec = ProfileRecord::new("alice", "2024-01-01 00:00");
        assert_eq!(Column::Size.cell(&rec), "");
        rec.size = DirSize::Bytes(0);
        assert_eq!(Column::Size.cell(&rec), "0 B");
    }

    #[test]
    fn delete_column_is_a_flag() {
        let rec = ProfileRecord::new("Public", "");
        assert_eq!(Column::Delete.kind(), ColumnKind::Flag);
        assert_eq!(Column::Delete.cell(&rec), "");
    }
}
