pub const PROFILE_LIST: &str =
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList";
pub const PROFILE_GUID: &str =
    r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileGuid";

pub const VALUE_PROFILE_IMAGE_PATH: &str = "ProfileImagePath";
pub const VALUE_GUID: &str = "Guid";
pub const VALUE_SID_STRING: &str = "SidString";

/// The two hives the registry check exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hive {
    ProfileList,
    ProfileGuid,
}

impl Hive {
    pub fn root(self) -> &'static str {
        match self {
            Hive::ProfileList => PROFILE_LIST,
            Hive::ProfileGuid => PROFILE_GUID,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Hive::ProfileList => "ProfileList.reg",
            Hive::ProfileGuid => "ProfileGuid.reg",
        }
    }

    /// Full key path of a direct child (`SID` or `{GUID}`).
    pub fn child(self, leaf: &str) -> String {
        format!(r"{}\{}", self.root(), leaf)
    }
}

/// Trailing segment of `path` when it is a direct child of `root`.
pub fn child_of<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    if path.len() <= root.len() + 1 || !path.is_char_boundary(root.len()) {
        return None;
    }
    let (head, tail) = path.split_at(root.len());
    if !head.eq_ignore_ascii_case(root) {
        return None;
    }
    let leaf = tail.strip_prefix('\\')?;
    if leaf.is_empty() || leaf.contains('\\') {
        None
    } else {
        Some(leaf)
    }
}

/// `HKEY_LOCAL_MACHINE\...` -> `\\computer\HKLM\...`, the form `reg.exe` takes for remote keys.
pub fn remote_key(computer: &str, key: &str) -> String {
    let short = match key.split_once('\\') {
        Some((hive, rest)) => {
            let abbrev = match hive.to_ascii_uppercase().as_str() {
                "HKEY_LOCAL_MACHINE" => "HKLM",
                "HKEY_USERS" => "HKU",
                _ => hive,
            };
            format!(r"{abbrev}\{rest}")
        }
        None => key.to_string(),
    };
    format!(r"\\{computer}\{short}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_children_only() {
        let sid = Hive::ProfileList.child("S-1-5-21-1");
        assert_eq!(child_of(&sid, PROFILE_LIST), Some("S-1-5-21-1"));
        assert_eq!(child_of(PROFILE_LIST, PROFILE_LIST), None);
        let nested = format!(r"{sid}\Extra");
        assert_eq!(child_of(&nested, PROFILE_LIST), None);
        assert_eq!(child_of(&Hive::ProfileGuid.child("{X}"), PROFILE_LIST), None);
    }

    #[test]
    fn root_match_ignores_case() {
        let lower = format!(r"{}\S-1", PROFILE_LIST.to_lowercase());
        assert_eq!(child_of(&lower, PROFILE_LIST), Some("S-1"));
    }

    #[test]
    fn remote_key_abbreviates_hive() {
        assert_eq!(
            remote_key("pc01", &Hive::ProfileList.child("S-1")),
            r"\\pc01\HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\ProfileList\S-1"
        );
    }
}
