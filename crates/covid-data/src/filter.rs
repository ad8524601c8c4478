//! Location filter resolution over the key space of a [`Store`].
//!
//! [`Store`]: covid_core::store::Store

use std::collections::BTreeSet;
use std::path::Path;

use covid_core::error::{CovidError, Result};
use covid_core::models::{FilterSpec, LocationKey};
use tracing::{debug, warn};

/// All keys satisfying `spec`, sorted and de-duplicated.
pub fn filter_locations<'a, I>(keys: I, spec: &FilterSpec) -> Vec<LocationKey>
where
    I: IntoIterator<Item = &'a LocationKey>,
{
    let matched: BTreeSet<LocationKey> = keys
        .into_iter()
        .filter(|key| spec.matches(key))
        .inspect(|key| debug!("Location {} matches filters", key.encode()))
        .cloned()
        .collect();
    matched.into_iter().collect()
}

/// Union of the matches for every filter line in `path`.
///
/// Each non-blank line is an encoded key (`country|state|county`, `*` for
/// unspecified). Lines that do not decode are logged and skipped.
pub fn filter_locations_from_file(
    keys: &[LocationKey],
    path: &Path,
    recursive: bool,
) -> Result<Vec<LocationKey>> {
    let content = std::fs::read_to_string(path).map_err(|source| CovidError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut matched = BTreeSet::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("Filter file line {}: {}", idx + 1, line);

        let Some(key) = LocationKey::decode(line) else {
            warn!(
                "{}:{}: expected country|state|county, skipping {:?}",
                path.display(),
                idx + 1,
                line
            );
            continue;
        };
        let spec = FilterSpec::from_key(&key, recursive);
        matched.extend(filter_locations(keys, &spec));
    }

    Ok(matched.into_iter().collect())
}

/// The one key `spec` selects. Zero or several matches is an error.
pub fn resolve_single<'a, I>(keys: I, spec: &FilterSpec) -> Result<LocationKey>
where
    I: IntoIterator<Item = &'a LocationKey>,
{
    let mut matched = filter_locations(keys, spec);
    if matched.len() != 1 {
        return Err(CovidError::AmbiguousFilter {
            matches: matched.len(),
        });
    }
    Ok(matched.remove(0))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
