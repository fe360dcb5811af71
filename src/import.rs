// Roster CSV import.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// One roster CSV row. Only `name` is required; extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawRosterRow {
    name: String,
    #[serde(default)]
    phone: String,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

fn read_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<(String, String)>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawRosterRow>() {
        match result {
            Ok(raw) => {
                let name = raw.name.trim().to_string();
                if name.is_empty() {
                    warn!("skipping roster row with empty name");
                    continue;
                }
                entries.push((name, raw.phone.trim().to_string()));
            }
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
            }
        }
    }
    Ok(entries)
}

/// Read a roster CSV with `name` and optional `phone` columns. Rows with a
/// blank name or that fail to parse are skipped, not fatal.
pub fn read_roster_csv(path: &Path) -> Result<Vec<(String, String)>, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_roster_from_reader(file).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}
