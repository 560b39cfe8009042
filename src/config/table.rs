//! Host table parsing.
//!
//! The host table is plain text with one entry per line, fields separated by
//! a single space or a single tab:
//!
//! ```text
//! example.com http://127.0.0.1:8080
//! example.org	https://10.0.0.2
//! secure.example.com - /etc/certs/secure.pem /etc/certs/secure.key
//! ```
//!
//! Two fields declare a route. Four fields declare a certificate pair for the
//! TLS listener; the second field is ignored. Anything else is skipped with a
//! warning so one bad line never blocks the rest of the table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::loader::{read_file, ConfigError};

/// A certificate pair named by the host table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    pub server_name: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Parsed host table: the route mapping plus any certificate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTable {
    routes: HashMap<String, Url>,
    certificates: Vec<CertificateEntry>,
    skipped: usize,
}

impl HostTable {
    /// Hostname to backend URL mapping.
    pub fn routes(&self) -> &HashMap<String, Url> {
        &self.routes
    }

    /// Certificate entries in file order.
    pub fn certificates(&self) -> &[CertificateEntry] {
        &self.certificates
    }

    /// Number of non-blank lines that were rejected.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Add or overwrite a route.
    pub fn insert(&mut self, hostname: impl Into<String>, backend: Url) {
        self.routes.insert(hostname.into(), backend);
    }
}

impl FromIterator<(String, Url)> for HostTable {
    fn from_iter<I: IntoIterator<Item = (String, Url)>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// Something that can produce a fresh host table on demand.
pub trait RouteSource: Send + Sync {
    /// Produce the current table. An empty table is not an error.
    fn load(&self) -> Result<HostTable, ConfigError>;

    /// Human readable origin for logs.
    fn describe(&self) -> String;
}

/// Host table read from a file on every load.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RouteSource for FileSource {
    fn load(&self) -> Result<HostTable, ConfigError> {
        let content = read_file(&self.path)?;
        Ok(parse_host_table(&content))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse host table text. Malformed lines are logged and skipped.
pub fn parse_host_table(text: &str) -> HostTable {
    let mut table = HostTable::default();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Ok(Entry::Route { hostname, backend }) => {
                tracing::debug!(line = line_number, host = %hostname, backend = %backend, "Adding route");
                table.routes.insert(hostname, backend);
            }
            Ok(Entry::Certificate(entry)) => {
                tracing::debug!(
                    line = line_number,
                    server_name = %entry.server_name,
                    cert = %entry.cert_path.display(),
                    "Adding certificate entry"
                );
                table.certificates.push(entry);
            }
            Err(reason) => {
                tracing::warn!(line = line_number, reason = %reason, "Skipping host table line");
                table.skipped += 1;
            }
        }
    }

    table
}

enum Entry {
    Route { hostname: String, backend: Url },
    Certificate(CertificateEntry),
}

fn parse_line(line: &str) -> Result<Entry, String> {
    let fields = split_fields(line);

    match fields.as_slice() {
        [hostname, backend] => {
            let hostname = non_empty(hostname, "hostname")?;
            let backend = parse_backend_url(backend)?;
            Ok(Entry::Route {
                hostname: hostname.to_string(),
                backend,
            })
        }
        [hostname, _, cert, key] => Ok(Entry::Certificate(CertificateEntry {
            server_name: non_empty(hostname, "hostname")?.to_string(),
            cert_path: PathBuf::from(non_empty(cert, "certificate path")?),
            key_path: PathBuf::from(non_empty(key, "key path")?),
        })),
        other => Err(format!("expected 2 or 4 fields, found {}", other.len())),
    }
}

/// Split on single spaces, falling back to single tabs. Separators are not mixed.
fn split_fields(line: &str) -> Vec<&str> {
    let by_space: Vec<&str> = line.split(' ').collect();
    if matches!(by_space.len(), 2 | 4) {
        return by_space;
    }
    line.split('\t').collect()
}

fn non_empty<'a>(field: &'a str, what: &str) -> Result<&'a str, String> {
    if field.is_empty() {
        Err(format!("empty {what}"))
    } else if field.contains(char::is_whitespace) {
        Err(format!("{what} {field:?} contains whitespace"))
    } else {
        Ok(field)
    }
}

/// Parse an absolute http(s) URL with a host.
pub fn parse_backend_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid backend URL {raw:?}: {e}"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported backend scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err(format!("backend URL {raw:?} has no host"));
    }

    Ok(url)
}
