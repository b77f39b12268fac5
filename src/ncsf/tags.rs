//! PSF tag list handling
//!
//! Tags follow the `[TAG]` marker as `name=value` lines. A value spanning
//! several lines is stored as repeated lines with the same name.

/// Marker that starts the tag section
pub const TAG_MARKER: &[u8; 5] = b"[TAG]";

/// Ordered tag list with case-insensitive names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    entries: Vec<(String, String)>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a tag, replacing an existing value in place
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append a line to a tag, creating it if needed
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => {
                let existing = &mut self.entries[i].1;
                existing.push('\n');
                existing.push_str(value);
            }
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the text that follows the `[TAG]` marker
    pub fn parse(text: &[u8]) -> Self {
        let mut tags = Self::new();
        for line in text.split(|&b| b == b'\n') {
            let Some(eq) = line.iter().position(|&b| b == b'=') else {
                continue;
            };
            let name = trim_whitespace(&line[..eq]);
            let value = trim_whitespace(&line[eq + 1..]);
            if name.is_empty() || value.is_empty() {
                continue;
            }
            tags.append(
                &String::from_utf8_lossy(name),
                &String::from_utf8_lossy(value),
            );
        }
        tags
    }

    /// Serialize as tag lines, without the `[TAG]` marker
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            for line in value.split('\n') {
                out.extend_from_slice(name.as_bytes());
                out.push(b'=');
                out.extend_from_slice(line.as_bytes());
                out.push(b'\n');
            }
        }
        out
    }
}

/// PSF tag whitespace is any byte in 0x01..=0x20
fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let is_ws = |b: &u8| (0x01..=0x20).contains(b);
    let start = bytes.iter().position(|b| !is_ws(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_ws(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Format whole seconds as `m:ss`, or `h:mm:ss` from one hour on
pub fn format_length(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds / 60) % 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Parse a `length`/`fade` style value (`[[h:]m:]s[.fff]`) into seconds
pub fn parse_length(text: &str) -> Option<f64> {
    let text = text.trim().replace(',', ".");
    let fields: Vec<&str> = text.split(':').collect();
    if fields.is_empty() || fields.len() > 3 {
        return None;
    }
    let mut seconds = 0.0;
    for (i, field) in fields.iter().enumerate() {
        let value: f64 = if i + 1 == fields.len() {
            field.parse().ok()?
        } else {
            field.parse::<u64>().ok()? as f64
        };
        if value < 0.0 {
            return None;
        }
        seconds = seconds * 60.0 + value;
    }
    Some(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut tags = TagList::new();
        tags.set("_lib", "game.ncsflib");
        tags.set("length", "1:00");
        tags.set("fade", "10");
        tags.set("LENGTH", "2:00");

        let names: Vec<&str> = tags.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["_lib", "length", "fade"]);
        assert_eq!(tags.get("length"), Some("2:00"));

        assert_eq!(tags.remove("Fade").as_deref(), Some("10"));
        assert!(!tags.contains("fade"));
        assert_eq!(tags.remove("fade"), None);
    }

    #[test]
    fn test_parse_trims_and_joins() {
        let tags = TagList::parse(b"  title = Battle \ncomment=one\ncomment=two\n=skip\nnovalue=\n");
        assert_eq!(tags.get("title"), Some("Battle"));
        assert_eq!(tags.get("comment"), Some("one\ntwo"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn test_multiline_serialization() {
        let mut tags = TagList::new();
        tags.set("comment", "one\ntwo");
        tags.set("fade", "0");
        assert_eq!(tags.to_bytes(), b"comment=one\ncomment=two\nfade=0\n".to_vec());
        assert_eq!(TagList::parse(&tags.to_bytes()), tags);
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(5), "0:05");
        assert_eq!(format_length(65), "1:05");
        assert_eq!(format_length(3725), "1:02:05");
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("1:05"), Some(65.0));
        assert_eq!(parse_length("1:02:05"), Some(3725.0));
        assert_eq!(parse_length("7,5"), Some(7.5));
        assert_eq!(parse_length("x:10"), None);
        assert_eq!(parse_length("1:2:3:4"), None);
    }
}
