//! Static forensic configuration
//!
//! Trust lists, watermark dictionaries, ICC keyword sets, and the camera
//! quantization database are embedded as JSON and deserialized once into a
//! typed, immutable [`Config`]. Detectors receive the configuration
//! explicitly; nothing in the pipeline reaches for module globals.

use crate::error::{Error, Result};
use crate::report::TrustLevel;
use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};

const FORENSIC_TABLES_JSON: &str = include_str!("../data/forensic_tables.json");
const QUANTIZATION_DB_JSON: &str = include_str!("../data/quantization_db.json");

/// An 8x8 JPEG quantization matrix.
pub type QuantMatrix = [[u16; 8]; 8];

#[derive(Debug, Clone, Deserialize)]
pub struct TrustedSoftware {
    pub trust_level: TrustLevel,
    /// Subtracted from the base editing penalty (85).
    pub penalty_reduction: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IccCameraProfile {
    pub description_contains: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct ForensicTables {
    /// Lowercased software-name fragment -> trust entry. Insertion order is
    /// the match-priority order.
    pub trusted_software: IndexMap<String, TrustedSoftware>,
    pub ai_generation_tools: Vec<String>,
    pub other_editors: Vec<String>,
    pub native_apps: Vec<String>,
    pub screenshot_software: Vec<String>,
    pub monitor_keywords: Vec<String>,
    pub stock_copyright_holders: Vec<String>,
    pub social_platforms: Vec<String>,
    pub ai_watermarks: IndexMap<String, Vec<String>>,
    pub stock_watermarks: IndexMap<String, Vec<String>>,
    pub icc_monitor_profiles: Vec<String>,
    pub icc_editing_profiles: Vec<String>,
    pub icc_camera_profiles: IndexMap<String, IccCameraProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantPattern {
    pub model_names: Vec<String>,
    pub luminance: QuantMatrix,
    #[serde(default)]
    pub chrominance: Option<QuantMatrix>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
struct QuantDbFile {
    cameras: IndexMap<String, IndexMap<String, QuantPattern>>,
    ai_generators: IndexMap<String, QuantPattern>,
}

/// Camera / AI-generator quantization fingerprint database.
///
/// Flattens the per-brand file layout into a lowercase model-name lookup,
/// the way the fingerprints are actually queried.
#[derive(Debug)]
pub struct QuantizationDb {
    /// Lowercased model name -> (brand, pattern).
    by_model: IndexMap<String, (String, QuantPattern)>,
    ai_patterns: IndexMap<String, QuantPattern>,
}

/// Result of a camera fingerprint lookup.
#[derive(Debug, Clone)]
pub struct QuantLookup<'a> {
    pub model_key: &'a str,
    pub pattern: &'a QuantPattern,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Partial,
    FuzzyBrand,
}

impl QuantizationDb {
    fn from_file(file: QuantDbFile) -> Self {
        let mut by_model = IndexMap::new();
        for (brand, models) in &file.cameras {
            for pattern in models.values() {
                for name in &pattern.model_names {
                    by_model.insert(
                        name.to_lowercase(),
                        (brand.clone(), pattern.clone()),
                    );
                }
            }
        }
        QuantizationDb {
            by_model,
            ai_patterns: file.ai_generators,
        }
    }

    /// Look up the expected fingerprint for a claimed camera model.
    ///
    /// Matching is layered: exact name, substring in either direction, then
    /// same-brand fallback keyed off well-known brand words.
    pub fn lookup(&self, camera_model: &str) -> Option<QuantLookup<'_>> {
        let key = camera_model.to_lowercase();
        let key = key.trim();

        if let Some((name, (_, pattern))) = self.by_model.get_key_value(key) {
            return Some(QuantLookup {
                model_key: name.as_str(),
                pattern,
                match_type: MatchType::Exact,
            });
        }

        for (name, (_, pattern)) in &self.by_model {
            if key.contains(name.as_str()) || name.contains(key) {
                return Some(QuantLookup {
                    model_key: name.as_str(),
                    pattern,
                    match_type: MatchType::Partial,
                });
            }
        }

        let brand = Self::brand_of(key)?;
        self.by_model
            .iter()
            .find(|(_, (b, _))| b == brand)
            .map(|(name, (_, pattern))| QuantLookup {
                model_key: name.as_str(),
                pattern,
                match_type: MatchType::FuzzyBrand,
            })
    }

    fn brand_of(model: &str) -> Option<&'static str> {
        camera_brand(model)
    }

    /// Known AI-generator quantization patterns.
    pub fn ai_patterns(&self) -> impl Iterator<Item = (&str, &QuantPattern)> {
        self.ai_patterns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Map a camera model string (lowercased) to its brand keyword, for
/// fingerprint and color-profile lookups.
pub fn camera_brand(model: &str) -> Option<&'static str> {
    const BRANDS: [(&str, &str); 7] = [
        ("iphone", "apple"),
        ("samsung", "samsung"),
        ("galaxy", "samsung"),
        ("pixel", "google"),
        ("canon", "canon"),
        ("nikon", "nikon"),
        ("sony", "sony"),
    ];
    BRANDS
        .iter()
        .find(|(keyword, _)| model.contains(keyword))
        .map(|(_, brand)| *brand)
}

/// Process-wide read-only configuration, loaded once at startup.
#[derive(Debug)]
pub struct Config {
    pub tables: ForensicTables,
    pub quantization: QuantizationDb,
}

impl Config {
    fn load() -> Result<Self> {
        let tables: ForensicTables = serde_json::from_str(FORENSIC_TABLES_JSON)
            .map_err(|e| Error::Config(format!("forensic tables: {e}")))?;
        let db: QuantDbFile = serde_json::from_str(QUANTIZATION_DB_JSON)
            .map_err(|e| Error::Config(format!("quantization db: {e}")))?;
        Ok(Config {
            tables,
            quantization: QuantizationDb::from_file(db),
        })
    }

    /// Shared configuration instance.
    ///
    /// Embedded JSON is validated by the test suite, so a parse failure here
    /// is a build defect, not a runtime condition.
    pub fn shared() -> Arc<Config> {
        static SHARED: LazyLock<Arc<Config>> =
            LazyLock::new(|| Arc::new(Config::load().expect("embedded config is well-formed")));
        SHARED.clone()
    }

    /// Best trusted-software match in `haystack`, preferring `priority`
    /// matches (the XMP CreatorTool field outranks the EXIF Software field
    /// for the RAW-workflow tools).
    pub fn match_trusted_software<'a>(
        &'a self,
        haystack: &str,
        priority: &str,
    ) -> Option<(&'a str, &'a TrustedSoftware)> {
        let mut best: Option<(&str, &TrustedSoftware)> = None;
        for (name, info) in &self.tables.trusted_software {
            if haystack.contains(name.as_str()) {
                if priority.contains(name.as_str()) {
                    return Some((name.as_str(), info));
                }
                if best.is_none() {
                    best = Some((name.as_str(), info));
                }
            }
        }
        best
    }
}
