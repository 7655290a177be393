//! Application constants for the survey curator
//!
//! Canonical column names, taxonomic markers, and default values shared
//! across the pipeline stages.

// =============================================================================
// Canonical Output Schema
// =============================================================================

/// Canonical output columns in their fixed export order
pub mod columns {
    pub const ABUNDANCE: &str = "Abundance";
    pub const BIOMASS: &str = "Biomass";
    pub const FAMILY: &str = "Family";
    pub const GENUS: &str = "Genus";
    pub const SPECIES: &str = "Species";
    pub const SAMPLE_DESCRIPTION: &str = "SampleDescription";
    pub const PLOT: &str = "Plot";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const DEPTH_ELEVATION: &str = "DepthElevation";
    pub const DAY: &str = "Day";
    pub const MONTH: &str = "Month";
    pub const YEAR: &str = "Year";
    pub const STUDY_ID: &str = "StudyID";

    /// All canonical columns, in export order
    pub const CANONICAL_ORDER: &[&str] = &[
        ABUNDANCE,
        BIOMASS,
        FAMILY,
        GENUS,
        SPECIES,
        SAMPLE_DESCRIPTION,
        PLOT,
        LATITUDE,
        LONGITUDE,
        DEPTH_ELEVATION,
        DAY,
        MONTH,
        YEAR,
        STUDY_ID,
    ];
}

// =============================================================================
// Sample Keys
// =============================================================================

/// Delimiter joining descriptor values into a sample key
pub const SAMPLE_KEY_SEPARATOR: &str = "_";

/// Default ordered descriptor fields for the sample key
pub const DEFAULT_SAMPLE_KEY_FIELDS: &[&str] = &[
    "study_id",
    "plot",
    "latitude",
    "longitude",
    "depth",
    "day",
    "month",
    "year",
];

// =============================================================================
// Taxonomy
// =============================================================================

/// Name endings that mark a family-rank name
pub const FAMILY_SUFFIXES: &[&str] = &["idae", "eae"];

/// Canonical marker for an unresolved species
pub const UNRESOLVED_SPECIES: &str = "sp";

/// Canonical suffix for species complexes
pub const AGGREGATE_SUFFIX: &str = "agg.";

/// Tokens (lowercase, trailing period stripped) marking an unresolved epithet
pub const UNRESOLVED_MARKERS: &[&str] = &["sp", "spp", "spec", "indet"];

/// Tokens (lowercase, trailing period stripped) marking a species complex
pub const AGGREGATE_MARKERS: &[&str] = &["agg", "aggr", "complex", "group", "grp"];

/// Tokens (lowercase, trailing period stripped) that introduce infraspecific ranks
pub const INFRASPECIFIC_MARKERS: &[&str] = &["subsp", "ssp", "var", "f", "forma", "morph"];

/// Tokens (lowercase, trailing period stripped) introducing a contributor's
/// morphospecies marker when no epithet precedes them, e.g. "Lycosa morph 2"
pub const MORPH_MARKERS: &[&str] = &["morph", "morpho", "morphotype"];

/// Tokens (lowercase, trailing period stripped) for open nomenclature
pub const OPEN_NOMENCLATURE_MARKERS: &[&str] = &["cf", "aff", "nr"];

/// Labels treated as "no identification supplied"
pub const PLACEHOLDER_LABELS: &[&str] = &[
    "na",
    "n/a",
    "nan",
    "null",
    "none",
    "unknown",
    "unidentified",
    "unid",
    "?",
    "-",
];

// =============================================================================
// Value Conventions
// =============================================================================

/// Text values treated as blank when reading untyped cells
pub const BLANK_MARKERS: &[&str] = &["", "na", "nan", "null", "n/a"];

/// Valid calendar year range
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Mean Earth radius in kilometres, used by the equal-area projection
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default number of rows sampled for CSV schema inference
pub const DEFAULT_INFER_SCHEMA_ROWS: usize = 10_000;

/// Default report file suffix written next to each export
pub const REPORT_SUFFIX: &str = "report.json";
