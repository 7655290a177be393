//! Taxon label decomposition and correction
//!
//! Splits a free-text label into family, genus and species components,
//! applies the genus correction table and canonicalizes open-nomenclature
//! markers. Parsing is deterministic: exact-match corrections only, no
//! fuzzy matching and no lookup against external registries.

use crate::config::SubgenusPolicy;
use crate::constants::{
    AGGREGATE_MARKERS, AGGREGATE_SUFFIX, FAMILY_SUFFIXES, INFRASPECIFIC_MARKERS, MORPH_MARKERS,
    OPEN_NOMENCLATURE_MARKERS, PLACEHOLDER_LABELS, UNRESOLVED_MARKERS, UNRESOLVED_SPECIES,
};
use crate::models::{Qualifier, TaxonComponents};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::report::WarningKind;

/// Parenthesised author citation, e.g. "(Linnaeus, 1758)"
static PAREN_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\d{4}[^()]*\)").expect("valid citation pattern"));

/// Genus followed by a parenthesised subgenus, e.g. "Amphiura (Acrocnida) brachiata"
static SUBGENUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S+)\s*\(\s*([A-Z][a-z]+)\s*\)").expect("valid subgenus pattern")
});

/// Any remaining parenthetical
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid parenthetical pattern"));

/// Unresolved marker with an attached discriminator, e.g. "sp1", "sp.2", "spA1", "sp1a", "spp.b".
/// A lowercase letter needs the period so genera such as "Spa" are not caught.
static NUMBERED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:spp?)(?:\.?([0-9][0-9A-Za-z]*|[A-Z][0-9]*)|\.([A-Za-z][0-9A-Za-z]*))\.?$")
        .expect("valid numbered marker pattern")
});

/// Bare discriminator following an unresolved marker, e.g. "2", "1a", "A1", "B" in "sp. B".
/// Longer alphabetic tokens are left alone so author names are not read as markers.
static DISCRIMINATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9][0-9A-Za-z]*|[A-Z]{1,3}[0-9]*|[a-z][0-9]*)\.?$")
        .expect("valid discriminator pattern")
});

/// Four-digit year, optionally wrapped in punctuation
static YEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(?\d{4}\)?[,.]?$").expect("valid year pattern"));

/// A label that cannot be decomposed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxonomyError {
    #[error("unparsable taxon label '{label}'")]
    UnparsableLabel { label: String },
}

/// Parsed components plus anomalies worth a curator's attention
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTaxon {
    pub components: TaxonComponents,
    pub warnings: Vec<(WarningKind, String)>,
}

/// Taxon parser bound to one dataset's correction table
#[derive(Debug, Clone)]
pub struct TaxonParser<'a> {
    corrections: &'a BTreeMap<String, String>,
    subgenus_policy: SubgenusPolicy,
}

impl<'a> TaxonParser<'a> {
    pub fn new(corrections: &'a BTreeMap<String, String>, subgenus_policy: SubgenusPolicy) -> Self {
        Self {
            corrections,
            subgenus_policy,
        }
    }

    /// Decompose a label, with an optional separately supplied family
    pub fn parse(
        &self,
        label: &str,
        family_label: Option<&str>,
    ) -> Result<ParsedTaxon, TaxonomyError> {
        let mut warnings = Vec::new();
        let mut family = family_label.map(clean_family).unwrap_or_default();

        let stripped = self.strip_annotations(label);
        let tokens: Vec<&str> = stripped
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| c == ',' || c == ';' || c == '?'))
            .filter(|t| !t.is_empty())
            .collect();

        let genus_token = tokens
            .first()
            .copied()
            .filter(|t| !is_placeholder(t) && !is_marker(t, UNRESOLVED_MARKERS))
            .filter(|t| !NUMBERED_MARKER.is_match(t))
            .filter(|t| t.chars().any(char::is_alphabetic));

        // Without a usable genus the record can still stand at family level
        let Some(genus_token) = genus_token else {
            if family.is_empty() {
                return Err(TaxonomyError::UnparsableLabel {
                    label: label.to_string(),
                });
            }
            return Ok(ParsedTaxon {
                components: family_level(family),
                warnings,
            });
        };

        let mut genus = capitalize(genus_token.trim_end_matches('.'));

        let lower = genus.to_lowercase();
        if FAMILY_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
            warnings.push((
                WarningKind::FamilyInGenusPosition,
                format!("'{}' looks like a family name in the genus position", genus),
            ));
            if family.is_empty() {
                family = genus;
            }
            return Ok(ParsedTaxon {
                components: family_level(family),
                warnings,
            });
        }

        if let Some(corrected) = self.corrections.get(&genus) {
            warnings.push((
                WarningKind::GenusCorrected,
                format!("genus '{}' -> '{}'", genus, corrected),
            ));
            genus = corrected.clone();
        }

        let epithet = parse_epithet(&tokens[1..], &mut warnings);

        let (species, qualifier) = match epithet {
            Epithet::Resolved(name) => (name, Qualifier::None),
            Epithet::Aggregate(Some(name)) => {
                (format!("{} {}", name, AGGREGATE_SUFFIX), Qualifier::Aggregate)
            }
            Epithet::Aggregate(None) => (AGGREGATE_SUFFIX.to_string(), Qualifier::Aggregate),
            Epithet::Unresolved(discriminator) => (
                format!("{}{}", UNRESOLVED_SPECIES, discriminator.unwrap_or_default()),
                Qualifier::Uncertain,
            ),
        };

        Ok(ParsedTaxon {
            components: TaxonComponents {
                family,
                genus,
                species,
                qualifier,
            },
            warnings,
        })
    }

    /// Remove citations and subgenus annotations ahead of tokenizing
    fn strip_annotations(&self, label: &str) -> String {
        let text = PAREN_CITATION.replace_all(label.trim(), " ");

        let text = match SUBGENUS.captures(&text) {
            Some(captures) => {
                let rest = &text[captures.get(0).map_or(0, |m| m.end())..];
                let kept = match self.subgenus_policy {
                    SubgenusPolicy::Promote => &captures[2],
                    SubgenusPolicy::Discard => &captures[1],
                };
                format!("{} {}", kept, rest)
            }
            None => text.into_owned(),
        };

        PARENTHETICAL.replace_all(&text, " ").into_owned()
    }
}

/// Outcome of reading the tokens after the genus
#[derive(Debug, Clone, PartialEq)]
enum Epithet {
    Resolved(String),
    Aggregate(Option<String>),
    Unresolved(Option<String>),
}

fn parse_epithet(tokens: &[&str], warnings: &mut Vec<(WarningKind, String)>) -> Epithet {
    let mut epithet: Option<String> = None;
    let mut unresolved = false;
    let mut discriminator: Option<String> = None;
    let mut aggregate = false;

    for token in tokens {
        if is_marker(token, OPEN_NOMENCLATURE_MARKERS) {
            warnings.push((
                WarningKind::OpenNomenclatureRemoved,
                format!("removed '{}'", token),
            ));
            continue;
        }

        if is_marker(token, AGGREGATE_MARKERS) {
            aggregate = true;
            continue;
        }

        if epithet.is_none()
            && (is_marker(token, UNRESOLVED_MARKERS) || is_marker(token, MORPH_MARKERS))
        {
            unresolved = true;
            continue;
        }

        if epithet.is_none() && discriminator.is_none() {
            if let Some(attached) = numbered_discriminator(token) {
                unresolved = true;
                discriminator = Some(attached);
                continue;
            }
            if unresolved {
                if let Some(captures) = DISCRIMINATOR.captures(token) {
                    discriminator = Some(captures[1].to_uppercase());
                    continue;
                }
            }
        }

        if is_marker(token, INFRASPECIFIC_MARKERS) {
            if epithet.is_some() {
                warnings.push((
                    WarningKind::InfraspecificRankDropped,
                    format!("dropped infraspecific rank from '{}'", tokens.join(" ")),
                ));
            }
            break;
        }

        if is_citation(token, epithet.is_some()) || unresolved {
            break;
        }

        if epithet.is_some() {
            warnings.push((
                WarningKind::InfraspecificRankDropped,
                format!("dropped trailing epithet '{}'", token),
            ));
            break;
        }

        epithet = Some(token.trim_end_matches('.').to_lowercase());
    }

    match (aggregate, unresolved, epithet) {
        (true, _, name) => Epithet::Aggregate(name),
        (false, false, Some(name)) => Epithet::Resolved(name),
        (false, _, _) => Epithet::Unresolved(discriminator),
    }
}

fn family_level(family: String) -> TaxonComponents {
    TaxonComponents {
        family,
        genus: String::new(),
        species: UNRESOLVED_SPECIES.to_string(),
        qualifier: Qualifier::Uncertain,
    }
}

/// Years and ampersands mark a citation; so does a capitalized word after the epithet
fn is_citation(token: &str, after_epithet: bool) -> bool {
    (after_epithet && token.chars().next().is_some_and(char::is_uppercase))
        || YEAR_TOKEN.is_match(token)
        || token == "&"
}

/// Discriminator attached to an unresolved marker, uppercased
fn numbered_discriminator(token: &str) -> Option<String> {
    let captures = NUMBERED_MARKER.captures(token)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_uppercase())
}

fn is_marker(token: &str, markers: &[&str]) -> bool {
    let normalized = token.trim_end_matches('.').to_lowercase();
    markers.contains(&normalized.as_str())
}

fn is_placeholder(token: &str) -> bool {
    PLACEHOLDER_LABELS.contains(&token.to_lowercase().as_str())
}

fn clean_family(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return String::new();
    }
    capitalize(trimmed.split_whitespace().next().unwrap_or_default())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
