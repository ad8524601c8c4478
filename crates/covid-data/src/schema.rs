//! Column-alias resolution for the evolving daily-report schema.
//!
//! Header names changed several times over the life of the dataset:
//!
//! * `Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered`
//! * the same plus `Latitude,Longitude`
//! * `FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,...`
//! * the same plus `Incidence_Rate,Case-Fatality_Ratio`
//!
//! Every era still resolves to the same five semantic fields through the
//! alias table below.

use std::collections::HashMap;

use chrono::NaiveDate;
use covid_core::models::RawRow;

/// One parsed record: header name → field text.
pub type RawFields = HashMap<String, String>;

// ── Semantic fields ───────────────────────────────────────────────────────────

/// Canonical fields every snapshot row is normalised to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Country,
    State,
    County,
    Cases,
    Deaths,
}

/// Ordered header aliases per semantic field; earlier aliases win.
#[derive(Debug, Clone, Copy)]
pub struct AliasTable {
    pub country: &'static [&'static str],
    pub state: &'static [&'static str],
    pub county: &'static [&'static str],
    pub cases: &'static [&'static str],
    pub deaths: &'static [&'static str],
}

impl AliasTable {
    pub fn aliases(&self, field: Field) -> &'static [&'static str] {
        match field {
            Field::Country => self.country,
            Field::State => self.state,
            Field::County => self.county,
            Field::Cases => self.cases,
            Field::Deaths => self.deaths,
        }
    }
}

/// Aliases covering every daily-report era.
pub const DAILY_REPORT_ALIASES: AliasTable = AliasTable {
    country: &["Country/Region", "Country_Region"],
    state: &["Province/State", "Province_State"],
    county: &["Admin2"],
    cases: &["Confirmed"],
    deaths: &["Deaths"],
};

// ── SchemaNormalizer ──────────────────────────────────────────────────────────

/// Maps a raw record of any era to a [`RawRow`]. Never fails: absent text
/// fields become wildcards and absent or malformed counts become 0.
#[derive(Debug, Clone, Copy)]
pub struct SchemaNormalizer {
    aliases: AliasTable,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new(DAILY_REPORT_ALIASES)
    }
}

impl SchemaNormalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn normalize(&self, fields: &RawFields, date: NaiveDate) -> RawRow {
        RawRow {
            country: self.text(fields, Field::Country),
            state: self.text(fields, Field::State),
            county: self.text(fields, Field::County),
            date,
            cases: self.count(fields, Field::Cases),
            deaths: self.count(fields, Field::Deaths),
        }
    }

    /// Value of the first alias present in `fields`, present meaning the
    /// column exists even when its cell is blank.
    fn lookup<'a>(&self, fields: &'a RawFields, field: Field) -> Option<&'a str> {
        self.aliases
            .aliases(field)
            .iter()
            .find_map(|alias| fields.get(*alias))
            .map(|v| v.trim())
    }

    fn text(&self, fields: &RawFields, field: Field) -> Option<String> {
        self.lookup(fields, field)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn count(&self, fields: &RawFields, field: Field) -> u64 {
        self.lookup(fields, field)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
