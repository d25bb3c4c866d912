//! Grid-mapfile parsing: certificate subject DN to local account.
//!
//! ```text
//! # comment
//! "/DC=org/DC=doegrids/OU=People/CN=Jane Doe 12345" jdoe,jdoe2
//! /O=Grid/CN=host/example.edu hostuser
//! ```

use std::collections::HashMap;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct GridMap {
    entries: HashMap<String, Vec<String>>,
}

impl GridMap {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((dn, rest)) = split_dn(line) else {
                continue;
            };
            let users: Vec<String> = rest
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
            if !users.is_empty() {
                // First mapping wins, as with the Globus tools.
                entries.entry(dn.to_string()).or_insert(users);
            }
        }
        Self { entries }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// The default local account for `dn`.
    pub fn lookup(&self, dn: &str) -> Option<&str> {
        self.entries
            .get(dn)
            .and_then(|users| users.first())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn split_dn(line: &str) -> Option<(&str, &str)> {
    if let Some(rest) = line.strip_prefix('"') {
        let end = rest.find('"')?;
        Some((&rest[..end], rest[end + 1..].trim()))
    } else {
        let (dn, rest) = line.split_once(char::is_whitespace)?;
        Some((dn, rest.trim()))
    }
}
