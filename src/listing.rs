//! Parsing of raw `LIST` output into typed entries.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

/// Entries found at one remote location, in server order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    pub path: String,
    pub entries: Vec<RemoteEntry>,
}

impl DirectoryListing {
    pub fn parse<S: AsRef<str>>(path: impl Into<String>, lines: &[S]) -> Self {
        Self {
            path: path.into(),
            entries: lines
                .iter()
                .filter_map(|line| parse_list_line(line.as_ref()))
                .collect(),
        }
    }

    /// Names of the entries of one kind. Symlinks belong to neither
    /// directories nor files.
    pub fn names(&self, kind: EntryKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.name.clone())
            .collect()
    }
}

pub fn parse_list_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with("total ") {
        return None;
    }

    let entry = parse_unix_line(line).or_else(|| parse_dos_line(line))?;
    if entry.name == "." || entry.name == ".." {
        return None;
    }
    Some(entry)
}

// drwxr-xr-x 2 user group 4096 Nov 15 10:30 Documents
fn parse_unix_line(line: &str) -> Option<RemoteEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 9 {
        return None;
    }

    let kind = match parts[0].chars().next()? {
        'd' => EntryKind::Directory,
        '-' => EntryKind::File,
        'l' => EntryKind::Symlink,
        _ => return None,
    };
    let size = parts[4].parse::<u64>().unwrap_or(0);

    let mut name = after_fields(line, 8)?;
    if kind == EntryKind::Symlink {
        name = name.split(" -> ").next().unwrap_or(name);
    }

    Some(RemoteEntry {
        name: name.to_string(),
        kind,
        size,
    })
}

// 01-15-24  10:30AM       <DIR>          Documents
// 01-15-24  10:30AM               12345 test.pdf
fn parse_dos_line(line: &str) -> Option<RemoteEntry> {
    let mut fields = line.split_whitespace();
    let date = fields.next()?;
    let time = fields.next()?;
    let marker = fields.next()?;

    let is_date = date.contains(['-', '/'])
        && date.chars().all(|c| c.is_ascii_digit() || c == '-' || c == '/');
    if !is_date || !time.contains(':') {
        return None;
    }

    let (kind, size) = if marker.eq_ignore_ascii_case("<DIR>") {
        (EntryKind::Directory, 0)
    } else {
        (EntryKind::File, marker.parse::<u64>().ok()?)
    };

    Some(RemoteEntry {
        name: after_fields(line, 3)?.to_string(),
        kind,
        size,
    })
}

/// The rest of `line` after skipping `count` whitespace-separated fields,
/// keeping the spacing inside the remainder intact.
fn after_fields(line: &str, count: usize) -> Option<&str> {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    (!rest.is_empty()).then_some(rest)
}
