//! Metadata validator: eleven-layer EXIF/XMP rules engine
//!
//! Each layer emits a check record; positive findings become red flags.
//! Most layers add their contribution to the running fraud score; the
//! smoking-gun layers (screenshot, software, XMP markers, messaging
//! fingerprint) instead raise the score to a floor, so stacked weak
//! evidence cannot shadow a single decisive finding. The final score is
//! clamped to [0, 100].

use super::{AnalysisContext, Detector};
use crate::error::Result;
use crate::icc;
use crate::loader::ImageFormat;
use crate::report::{
    Check, CheckStatus, DetectorData, DetectorId, DetectorReport, RedFlag, RiskLevel, Severity,
    TrustLevel, ValidatorReport,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

// Layer base penalties.
const APPLE_RUNTIME_MISSING: i32 = 95;
const MONITOR_PROFILE_DETECTED: i32 = 95;
const AI_SOFTWARE_DETECTED: i32 = 98;
const EDITING_BASE_PENALTY: i32 = 85;
const GPS_MISSING_MODERN: i32 = 70;
const GPS_MISSING: i32 = 30;
const TIMESTAMP_MODIFIED: i32 = 75;
const LENS_MISMATCH: i32 = 60;
const PHYSICS_VIOLATION: i32 = 88;
const MESSAGING_APP: i32 = 80;

const EXIF_TIMESTAMP_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub struct MetadataValidator;

#[async_trait]
impl Detector for MetadataValidator {
    fn id(&self) -> DetectorId {
        DetectorId::Metadata
    }

    async fn analyze(&self, ctx: Arc<AnalysisContext>) -> Result<DetectorReport> {
        tokio::task::spawn_blocking(move || Ok(run(&ctx)))
            .await
            .map_err(|e| crate::error::Error::DetectorFailed(e.to_string()))?
    }
}

/// One layer's outcome. `floor` findings raise the running score to their
/// value instead of adding to it.
struct Layer {
    check: Check,
    flag: Option<RedFlag>,
    floor: bool,
}

impl Layer {
    fn pass(name: &str, reason: impl Into<String>) -> Layer {
        Layer {
            check: Check::new(name, CheckStatus::Pass, 0.0, reason),
            flag: None,
            floor: false,
        }
    }

    fn not_applicable(name: &str, reason: impl Into<String>) -> Layer {
        Layer {
            check: Check::new(name, CheckStatus::NotApplicable, 0.0, reason),
            flag: None,
            floor: false,
        }
    }
}

struct FlagSpec {
    score: i32,
    severity: Severity,
    trust_level: Option<TrustLevel>,
    requires_visual_proof: Option<bool>,
    description: Option<String>,
}

fn finding(
    name: &str,
    status: CheckStatus,
    reason: impl Into<String>,
    spec: FlagSpec,
    floor: bool,
) -> Layer {
    let reason = reason.into();
    Layer {
        check: Check::new(name, status, spec.score as f64, reason.clone()),
        flag: Some(RedFlag {
            layer: name.into(),
            reason,
            severity: spec.severity,
            score: spec.score,
            trust_level: spec.trust_level,
            requires_visual_proof: spec.requires_visual_proof,
            description: spec.description,
        }),
        floor,
    }
}

fn run(ctx: &AnalysisContext) -> DetectorReport {
    let layers = [
        check_camera_authenticity(ctx),
        check_apple_runtime(ctx),
        check_screenshot(ctx),
        check_software(ctx),
        check_gps(ctx),
        check_timestamps(ctx),
        check_xmp_markers(ctx),
        check_physics(ctx),
        check_lens_consistency(ctx),
        check_format(ctx),
        check_messaging_app(ctx),
    ];

    let mut score: i64 = 0;
    let mut checks = Vec::with_capacity(layers.len());
    let mut red_flags = Vec::new();

    for layer in layers {
        if let Some(flag) = layer.flag {
            if layer.floor {
                let old = score;
                score = score.max(flag.score as i64);
                debug!(layer = %flag.layer, old, new = score, "floor contribution");
            } else {
                score += flag.score as i64;
                debug!(layer = %flag.layer, delta = flag.score, total = score, "additive contribution");
            }
            red_flags.push(flag);
        }
        checks.push(layer.check);
    }

    let fraud_score = score.clamp(0, 100) as u32;
    let risk_level = RiskLevel::from_score(fraud_score);
    info!(
        fraud_score,
        ?risk_level,
        red_flags = red_flags.len(),
        mode = ?ctx.mode,
        "metadata validation complete"
    );

    let validator = ValidatorReport {
        fraud_score,
        risk_level,
        red_flags,
        summary: summary_for(fraud_score).into(),
    };

    let mut report = DetectorReport::new(DetectorId::Metadata, fraud_score as f64 / 100.0);
    report.checks = checks;
    report
        .details
        .insert("exif_fields".into(), ctx.exif.len().to_string());
    report.data = DetectorData::Metadata(validator);
    report
}

fn summary_for(score: u32) -> &'static str {
    match score {
        80.. => "High probability of AI generation or manipulation",
        60..=79 => "Suspicious indicators detected, manual review recommended",
        40..=59 => "Some concerns identified, additional verification suggested",
        20..=39 => "Minor anomalies detected, likely legitimate",
        _ => "Strong indicators of authentic photograph",
    }
}

/// Layer 0: serial numbers are evidence *for* authenticity; generators
/// cannot produce consistent camera/lens serials. Contributions are
/// negative (bonuses).
fn check_camera_authenticity(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Camera Authenticity";

    let camera_serial = ["SerialNumber", "EXIF:SerialNumber", "MakerNotes:InternalSerialNumber", "MakerNotes:SerialNumber"]
        .iter()
        .find_map(|k| ctx.tag(k))
        .filter(|v| !v.is_empty());
    let lens_serial = ["LensSerialNumber", "EXIF:LensSerialNumber", "MakerNotes:LensSerialNumber"]
        .iter()
        .find_map(|k| ctx.tag(k))
        .filter(|v| !v.is_empty());

    let camera = format!(
        "{} {}",
        ctx.tag("Make").unwrap_or(""),
        ctx.tag("Model").unwrap_or("")
    );

    let (score, reason, description) = match (camera_serial, lens_serial) {
        (Some(_), Some(_)) => (
            -30,
            format!("Camera + Lens serials verified ({})", camera.trim()),
            "Hardware serial pairs cannot be fabricated by generators",
        ),
        (Some(_), None) => (
            -20,
            format!("Camera serial verified ({})", camera.trim()),
            "Camera serial number indicates real hardware",
        ),
        (None, Some(_)) => (
            -15,
            "Lens serial verified".to_string(),
            "Lens serial number indicates real hardware",
        ),
        (None, None) => {
            return Layer::not_applicable(
                NAME,
                "No serial numbers in EXIF (not all cameras include these)",
            )
        }
    };

    finding(
        NAME,
        CheckStatus::Pass,
        reason,
        FlagSpec {
            score,
            severity: Severity::Bonus,
            trust_level: None,
            requires_visual_proof: None,
            description: Some(description.into()),
        },
        false,
    )
}

/// Layer 1: iPhone photos carry processor-generated runtime tokens in the
/// MakerNote; their absence on a claimed iPhone is decisive.
fn check_apple_runtime(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Apple Hardware Token";

    if ctx.exif_absence_expected() {
        return Layer::not_applicable(NAME, "EXIF stripped by transport channel (expected)");
    }

    let make = ctx.tag_lower("Make");
    let model = ctx.tag_lower("Model");
    let is_iphone = make.contains("apple") || model.contains("iphone");
    if !is_iphone {
        return Layer::not_applicable(NAME, "Not an iPhone photo");
    }

    let runtime_markers = [
        "MakerNotes:RunTimeFlags",
        "Composite:RunTimeSincePowerUp",
        "MakerNotes:RunTimeEpoch",
        "MakerNotes:AccelerationVector",
    ];
    let present = runtime_markers
        .iter()
        .find(|k| ctx.tag(k).map(|v| !v.is_empty()).unwrap_or(false));

    match present {
        Some(marker) => Layer::pass(
            NAME,
            format!("Valid Apple runtime token detected ({marker})"),
        ),
        None => finding(
            NAME,
            CheckStatus::Fail,
            "Missing Apple runtime token (unfakeable hardware marker)",
            FlagSpec {
                score: APPLE_RUNTIME_MISSING,
                severity: Severity::Critical,
                trust_level: None,
                requires_visual_proof: None,
                description: Some(
                    "Original iPhone photos contain processor-generated tokens that cannot be fabricated"
                        .into(),
                ),
            },
            false,
        ),
    }
}

/// Layer 2: monitor color profiles and capture-tool names betray
/// screenshots; a camera photo should never carry them.
fn check_screenshot(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Screenshot Detection";
    let tables = &ctx.config.tables;

    if let Some(summary) = ctx.icc_profile.as_deref().and_then(icc::inspect) {
        if let Some(description) = &summary.description {
            let lower = description.to_lowercase();
            if lower.contains("display p3") {
                return Layer::pass(NAME, "Display P3 - legitimate iPhone camera profile");
            }
            for keyword in &tables.monitor_keywords {
                if lower.contains(&keyword.to_lowercase()) {
                    return finding(
                        NAME,
                        CheckStatus::Fail,
                        format!("Monitor profile detected: {keyword} (screenshot source)"),
                        FlagSpec {
                            score: MONITOR_PROFILE_DETECTED,
                            severity: Severity::Critical,
                            trust_level: None,
                            requires_visual_proof: None,
                            description: Some("Image captured from a screen, not a camera".into()),
                        },
                        true,
                    );
                }
            }
        }
    }

    let software = ctx.tag_lower("Software");
    for keyword in &tables.screenshot_software {
        if software.contains(keyword) {
            return finding(
                NAME,
                CheckStatus::Fail,
                format!("Screenshot software detected: {software}"),
                FlagSpec {
                    score: MONITOR_PROFILE_DETECTED,
                    severity: Severity::Critical,
                    trust_level: None,
                    requires_visual_proof: None,
                    description: None,
                },
                true,
            );
        }
    }

    let has_camera_id = ["Make", "Model", "LensModel"]
        .iter()
        .any(|k| ctx.tag(k).map(|v| !v.is_empty()).unwrap_or(false));
    if !has_camera_id && !ctx.exif.is_empty() {
        let copyright = ctx.tag_lower("Copyright");
        for service in &tables.stock_copyright_holders {
            if copyright.contains(service) {
                return Layer::pass(
                    NAME,
                    format!("Stock photo from {service} (EXIF stripped by provider)"),
                );
            }
        }
        return finding(
            NAME,
            CheckStatus::Warn,
            "Missing camera info (possible screenshot)",
            FlagSpec {
                score: 40,
                severity: Severity::Medium,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            true,
        );
    }

    Layer::pass(NAME, "No screenshot indicators found")
}

/// Layer 3: software fields distinguish generators (decisive), trusted
/// photo tools (reduced penalty, needs visual proof), and generic editors.
fn check_software(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Software Manipulation";
    let tables = &ctx.config.tables;

    let software = ctx.tag_lower("Software");
    let creator_tool = ctx
        .tag("XMP:CreatorTool")
        .or_else(|| ctx.tag("CreatorTool"))
        .map(|v| v.to_lowercase())
        .unwrap_or_default();
    let combined = format!("{software} {creator_tool}");

    for tool in &tables.ai_generation_tools {
        if combined.contains(tool) {
            return finding(
                NAME,
                CheckStatus::Fail,
                format!("AI generation tool detected: {tool}"),
                FlagSpec {
                    score: AI_SOFTWARE_DETECTED,
                    severity: Severity::Critical,
                    trust_level: None,
                    requires_visual_proof: Some(false),
                    description: Some("Definitive proof of AI generation".into()),
                },
                true,
            );
        }
    }

    if let Some((name, info)) = ctx.config.match_trusted_software(&combined, &creator_tool) {
        let adjusted = (EDITING_BASE_PENALTY - info.penalty_reduction as i32).max(0);
        let matched_in = if creator_tool.contains(name) {
            "CreatorTool"
        } else {
            "Software"
        };
        debug!(
            tool = name,
            matched_in,
            adjusted,
            "trusted photo software matched"
        );
        let status = if adjusted > 20 {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        return finding(
            NAME,
            status,
            format!("Professional photo software: {name} (from {matched_in})"),
            FlagSpec {
                score: adjusted,
                severity: Severity::Low,
                trust_level: Some(info.trust_level),
                requires_visual_proof: Some(true),
                description: Some("Legitimate photo editing tool".into()),
            },
            true,
        );
    }

    for tool in &tables.other_editors {
        if combined.contains(tool) {
            return finding(
                NAME,
                CheckStatus::Warn,
                format!("Editing software detected: {tool}"),
                FlagSpec {
                    score: 60,
                    severity: Severity::Medium,
                    trust_level: None,
                    requires_visual_proof: Some(true),
                    description: None,
                },
                true,
            );
        }
    }

    for app in &tables.native_apps {
        if combined.contains(app) {
            let shown = if software.is_empty() { &creator_tool } else { &software };
            return Layer::pass(NAME, format!("Native photo app: {shown}"));
        }
    }

    Layer::pass(NAME, "No editing software detected")
}

/// Layer 4: modern phones always geotag; a missing GPS block on a recent
/// model is a strong tell.
fn check_gps(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "GPS Validation";

    if ctx.exif_absence_expected() {
        return Layer::not_applicable(NAME, "GPS stripped by transport channel (expected)");
    }

    let gps_present = ctx.exif.keys().any(|k| k.starts_with("GPS"));
    if gps_present {
        return Layer::pass(NAME, "GPS coordinates present");
    }

    const MODERN_MODEL_YEARS: [&str; 11] = [
        "11", "12", "13", "14", "15", "20", "21", "22", "23", "24", "25",
    ];
    let model = ctx.tag("Model").unwrap_or("");
    let is_modern = MODERN_MODEL_YEARS.iter().any(|y| model.contains(y));

    if is_modern {
        finding(
            NAME,
            CheckStatus::Fail,
            "GPS data missing on modern device",
            FlagSpec {
                score: GPS_MISSING_MODERN,
                severity: Severity::High,
                trust_level: None,
                requires_visual_proof: None,
                description: Some("Modern smartphones embed GPS coordinates by default".into()),
            },
            false,
        )
    } else {
        finding(
            NAME,
            CheckStatus::Warn,
            "GPS data missing",
            FlagSpec {
                score: GPS_MISSING,
                severity: Severity::Medium,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        )
    }
}

/// Layer 5: the gap between capture and modification timestamps.
/// Professional RAW workflows legitimately edit hours later, so a trusted
/// tool in Software waives the big-gap penalty.
fn check_timestamps(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Timestamp Consistency";

    if ctx.exif_absence_expected() {
        return Layer::not_applicable(NAME, "Timestamps stripped by transport channel (expected)");
    }

    let original = ctx.tag("DateTimeOriginal");
    let modified = ctx.tag("DateTime");
    let (Some(original), Some(modified)) = (original, modified) else {
        return finding(
            NAME,
            CheckStatus::Warn,
            "Missing timestamps",
            FlagSpec {
                score: 20,
                severity: Severity::Low,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        );
    };

    let software = ctx.tag_lower("Software");
    let trusted_tool = ctx
        .config
        .tables
        .trusted_software
        .keys()
        .any(|name| software.contains(name.as_str()));

    let parsed = (
        NaiveDateTime::parse_from_str(original, EXIF_TIMESTAMP_FORMAT),
        NaiveDateTime::parse_from_str(modified, EXIF_TIMESTAMP_FORMAT),
    );
    let (Ok(dt_original), Ok(dt_modified)) = parsed else {
        // Unparseable timestamps carry no signal either way.
        return Layer::pass(NAME, "Timestamps consistent");
    };

    let gap = (dt_modified - dt_original).num_seconds().unsigned_abs();
    if gap > 3600 {
        let hours = gap as f64 / 3600.0;
        if trusted_tool {
            return Layer::pass(
                NAME,
                format!(
                    "Professional editing workflow (modified {hours:.1}h after capture with trusted software)"
                ),
            );
        }
        return finding(
            NAME,
            CheckStatus::Fail,
            format!("Photo modified {hours:.1}h after capture (no professional software detected)"),
            FlagSpec {
                score: TIMESTAMP_MODIFIED,
                severity: Severity::High,
                trust_level: None,
                requires_visual_proof: None,
                description: Some(
                    "Large capture-to-modification gap without professional tooling".into(),
                ),
            },
            false,
        );
    }
    if gap > 60 {
        let (score, severity) = if trusted_tool {
            (10, Severity::Low)
        } else {
            (30, Severity::Medium)
        };
        return finding(
            NAME,
            CheckStatus::Warn,
            format!("Minor modification {gap}s after capture"),
            FlagSpec {
                score,
                severity,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        );
    }

    Layer::pass(NAME, "Timestamps consistent")
}

static GEMINI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bgemini\b").unwrap());
static IMAGEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bimagen\b").unwrap());
static AI_CONTEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ai|artificial.?intelligence|trainedalgorithmicmedia)\b").unwrap());

/// Layer 6: AI attribution markers inside the XMP envelope. The search is
/// scoped to the packet so incidental words elsewhere in the file cannot
/// fire it; gemini/imagen need a corroborating AI-context token.
fn check_xmp_markers(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "XMP AI Markers";

    let Some(packet) = &ctx.xmp_packet else {
        return Layer::pass(NAME, "No XMP metadata present");
    };
    let section = packet.to_lowercase();

    const DEFINITIVE_MARKERS: [(&str, &str); 3] = [
        ("edited with google ai", "Google AI editing marker"),
        ("trainedalgorithmicmedia", "AI-generated content tag"),
        ("google ai", "Google AI attribution"),
    ];
    for (marker, description) in DEFINITIVE_MARKERS {
        if section.contains(marker) {
            return finding(
                NAME,
                CheckStatus::Fail,
                format!("XMP AI marker: {marker}"),
                FlagSpec {
                    score: AI_SOFTWARE_DETECTED,
                    severity: Severity::Critical,
                    trust_level: None,
                    requires_visual_proof: Some(false),
                    description: Some(format!("Definitive proof: {description}")),
                },
                true,
            );
        }
    }

    let has_tool_word = GEMINI_RE.is_match(&section) || IMAGEN_RE.is_match(&section);
    if has_tool_word && AI_CONTEXT_RE.is_match(&section) {
        return finding(
            NAME,
            CheckStatus::Fail,
            "Google AI tool detected in XMP (Gemini/Imagen)",
            FlagSpec {
                score: AI_SOFTWARE_DETECTED,
                severity: Severity::Critical,
                trust_level: None,
                requires_visual_proof: Some(false),
                description: Some("AI generation tool attribution found".into()),
            },
            true,
        );
    }

    Layer::pass(NAME, "No AI markers in XMP metadata")
}

/// Layer 7: claimed optics must be physically possible for the claimed
/// body. iPhone apertures live in f/1.0-f/3.0.
fn check_physics(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Physics Validation";

    let model = ctx.tag_lower("Model");
    if model.contains("iphone") {
        if let Some(f_value) = ctx.tag("FNumber").and_then(|v| v.parse::<f64>().ok()) {
            if !(1.0..=3.0).contains(&f_value) {
                return finding(
                    NAME,
                    CheckStatus::Fail,
                    format!("Impossible aperture for iPhone: f/{f_value}"),
                    FlagSpec {
                        score: PHYSICS_VIOLATION,
                        severity: Severity::Critical,
                        trust_level: None,
                        requires_visual_proof: None,
                        description: Some("Fabricated EXIF data".into()),
                    },
                    false,
                );
            }
        }
    }

    Layer::pass(NAME, "Camera parameters valid")
}

/// Layer 8: lens identity must match the body.
fn check_lens_consistency(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Lens Consistency";

    let lens_model = ctx.tag_lower("LensModel");
    if lens_model.is_empty() {
        return Layer::pass(NAME, "No lens model specified");
    }

    let model = ctx.tag_lower("Model");
    if model.contains("iphone") && (lens_model.contains("canon") || lens_model.contains("nikon")) {
        return finding(
            NAME,
            CheckStatus::Fail,
            format!("iPhone with DSLR lens: {lens_model}"),
            FlagSpec {
                score: LENS_MISMATCH,
                severity: Severity::High,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        );
    }

    Layer::pass(NAME, "Lens matches device")
}

/// Layer 9: cameras emit JPEG/HEIC; PNG and WebP arrivals mostly mean
/// screenshots, editors, or generator output.
fn check_format(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Format Validation";

    match ctx.image.format {
        ImageFormat::Png => finding(
            NAME,
            CheckStatus::Warn,
            "PNG format (typically screenshots or editing)",
            FlagSpec {
                score: 40,
                severity: Severity::Medium,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        ),
        ImageFormat::Webp => finding(
            NAME,
            CheckStatus::Warn,
            "WebP format (AI generation or web download)",
            FlagSpec {
                score: 50,
                severity: Severity::Medium,
                trust_level: None,
                requires_visual_proof: None,
                description: None,
            },
            false,
        ),
        other => Layer::pass(NAME, format!("{} is standard camera format", other.name())),
    }
}

/// Layer 10: messaging apps strip EXIF and re-encode to characteristic
/// sizes. Five weighted indicators combine into a fingerprint confidence.
fn check_messaging_app(ctx: &AnalysisContext) -> Layer {
    const NAME: &str = "Messaging App Detection";
    let tables = &ctx.config.tables;

    if let Some(platform) = &ctx.source_platform {
        let platform_lower = platform.to_lowercase();
        if tables.social_platforms.iter().any(|p| *p == platform_lower) {
            return Layer::pass(
                NAME,
                format!("Image from {platform} (EXIF stripped by platform)"),
            );
        }
    }

    let copyright = ctx.tag_lower("Copyright");
    for service in &tables.stock_copyright_holders {
        if copyright.contains(service) {
            return Layer::pass(NAME, format!("Stock photo from {service} (not messaging app)"));
        }
    }

    let file_size = ctx.bytes.len();
    let (width, height) = (ctx.image.width as usize, ctx.image.height as usize);
    let max_dimension = width.max(height);

    let mut confidence = 0.0;
    let mut reasons: Vec<String> = Vec::new();

    if ctx.exif.len() < 3 {
        confidence += 0.50;
        reasons.push("Complete EXIF absence".into());
    }
    if (50_000..=1_500_000).contains(&file_size) {
        confidence += 0.20;
        reasons.push(format!("File size {}KB in messaging range", file_size / 1024));
    }
    if width * height > 0 {
        let bytes_per_pixel = file_size as f64 / (width * height) as f64;
        if (0.10..=0.50).contains(&bytes_per_pixel) {
            confidence += 0.10;
            reasons.push(format!("Aggressive compression ({bytes_per_pixel:.2} bytes/pixel)"));
        }
    }
    if max_dimension == 1600 {
        confidence += 0.30;
        reasons.push("WhatsApp resize signature (1600px)".into());
    }
    if max_dimension == 1280 {
        confidence += 0.30;
        reasons.push("Telegram resize signature (1280px)".into());
    }

    if confidence >= 0.60 {
        let mut layer = finding(
            NAME,
            CheckStatus::Fail,
            format!("WhatsApp/Telegram detected (confidence: {confidence:.2})"),
            FlagSpec {
                score: MESSAGING_APP,
                severity: Severity::Critical,
                trust_level: None,
                requires_visual_proof: None,
                description: Some("Messaging apps strip all forensic metadata".into()),
            },
            true,
        );
        if let Some(flag) = &mut layer.flag {
            flag.description = Some(reasons.join("; "));
        }
        return layer;
    }

    Layer::pass(NAME, "No messaging app processing detected")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testctx::context;
    use crate::request::Mode;

    fn validate(ctx: &AnalysisContext) -> ValidatorReport {
        match run(ctx).data {
            DetectorData::Metadata(v) => v,
            _ => unreachable!("validator emits metadata findings"),
        }
    }

    #[test]
    fn iphone_without_runtime_token_is_critical() {
        let ctx = context()
            .tag("Make", "Apple")
            .tag("Model", "iPhone 13 Pro")
            .tag("DateTime", "2025:01:01 10:00:00")
            .build();
        let report = validate(&ctx);
        assert!(report.fraud_score >= 95);
        assert!(report
            .red_flags
            .iter()
            .any(|f| f.layer == "Apple Hardware Token" && f.severity == Severity::Critical));
    }

    #[test]
    fn runtime_token_clears_apple_layer() {
        let ctx = context()
            .tag("Make", "Apple")
            .tag("Model", "iPhone 13 Pro")
            .tag("MakerNotes:RunTimeFlags", "1")
            .build();
        let report = validate(&ctx);
        assert!(!report
            .red_flags
            .iter()
            .any(|f| f.layer == "Apple Hardware Token"));
    }

    #[test]
    fn serial_numbers_reduce_fraud_score() {
        let base = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("DateTime", "2025:01:01 10:00:00")
            .build();
        let with_serials = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("DateTime", "2025:01:01 10:00:00")
            .tag("SerialNumber", "123456789")
            .tag("LensSerialNumber", "987654")
            .build();

        let plain = validate(&base);
        let bonused = validate(&with_serials);
        assert!(bonused.fraud_score < plain.fraud_score);
        assert!(bonused
            .red_flags
            .iter()
            .any(|f| f.severity == Severity::Bonus && f.score == -30));
    }

    #[test]
    fn ai_software_floors_score_at_98() {
        let ctx = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("Software", "Midjourney v6")
            .tag("SerialNumber", "123456789")
            .build();
        let report = validate(&ctx);
        assert!(report.fraud_score >= 68); // floor 98 minus serial bonus path
        let flag = report
            .red_flags
            .iter()
            .find(|f| f.layer == "Software Manipulation")
            .unwrap();
        assert_eq!(flag.score, 98);
        assert_eq!(flag.requires_visual_proof, Some(false));
        assert_eq!(flag.severity, Severity::Critical);
    }

    #[test]
    fn lightroom_gets_reduced_penalty_and_trust_level() {
        let ctx = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("Software", "Adobe Lightroom 7.1")
            .build();
        let report = validate(&ctx);
        let flag = report
            .red_flags
            .iter()
            .find(|f| f.layer == "Software Manipulation")
            .unwrap();
        assert_eq!(flag.score, 35); // 85 base - 50 reduction
        assert_eq!(flag.trust_level, Some(TrustLevel::High));
        assert_eq!(flag.requires_visual_proof, Some(true));
    }

    #[test]
    fn photo_mode_relaxes_exif_absence_layers() {
        let photo = context().mode(Mode::Photo).byte_len(2_000_000).build();
        let document = context().mode(Mode::Document).byte_len(2_000_000).build();

        let relaxed = validate(&photo);
        let strict = validate(&document);
        // Mode relaxation must never raise the score.
        assert!(relaxed.fraud_score <= strict.fraud_score);
    }

    #[test]
    fn messaging_fingerprint_fires_on_stripped_resized_jpeg() {
        let ctx = context()
            .mode(Mode::Document)
            .dims(1280, 960)
            .byte_len(300_000)
            .build();
        let report = validate(&ctx);
        let flag = report
            .red_flags
            .iter()
            .find(|f| f.layer == "Messaging App Detection")
            .expect("fingerprint should fire");
        assert_eq!(flag.score, 80);
        assert!(flag.reason.contains("WhatsApp/Telegram"));
        assert!(report.fraud_score >= 80);
    }

    #[test]
    fn messaging_fingerprint_suppressed_for_known_platform() {
        let ctx = context()
            .mode(Mode::Document)
            .dims(1280, 960)
            .byte_len(300_000)
            .source_platform("LinkedIn")
            .build();
        let report = validate(&ctx);
        assert!(!report
            .red_flags
            .iter()
            .any(|f| f.layer == "Messaging App Detection"));
    }

    #[test]
    fn impossible_iphone_aperture_is_flagged() {
        let ctx = context()
            .tag("Make", "Apple")
            .tag("Model", "iPhone 13")
            .tag("MakerNotes:RunTimeFlags", "1")
            .tag("FNumber", "8")
            .build();
        let report = validate(&ctx);
        assert!(report
            .red_flags
            .iter()
            .any(|f| f.layer == "Physics Validation" && f.score == 88));
    }

    #[test]
    fn timestamp_gap_waived_for_trusted_software() {
        let trusted = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("Software", "Adobe Lightroom 7.1")
            .tag("DateTimeOriginal", "2025:01:01 10:00:00")
            .tag("DateTime", "2025:01:02 15:00:00")
            .build();
        let untrusted = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .tag("DateTimeOriginal", "2025:01:01 10:00:00")
            .tag("DateTime", "2025:01:02 15:00:00")
            .build();

        let waived = validate(&trusted);
        assert!(!waived
            .red_flags
            .iter()
            .any(|f| f.layer == "Timestamp Consistency"));

        let flagged = validate(&untrusted);
        let flag = flagged
            .red_flags
            .iter()
            .find(|f| f.layer == "Timestamp Consistency")
            .unwrap();
        assert_eq!(flag.score, TIMESTAMP_MODIFIED);
    }

    #[test]
    fn xmp_google_ai_marker_is_decisive() {
        let ctx = context()
            .tag("Make", "Google")
            .tag("Model", "Pixel 8")
            .xmp("<x:xmpmeta>Edited with Google AI</x:xmpmeta>")
            .build();
        let report = validate(&ctx);
        assert!(report.fraud_score >= 98);
        let flag = report
            .red_flags
            .iter()
            .find(|f| f.layer == "XMP AI Markers")
            .unwrap();
        assert!(flag.reason.to_lowercase().contains("google ai"));
    }

    #[test]
    fn gemini_requires_ai_context() {
        let bare = context()
            .tag("Make", "Google")
            .tag("Model", "Pixel 8")
            .tag("MakerNotes:RunTimeFlags", "1")
            .xmp("<x:xmpmeta>shot near the Gemini observatory</x:xmpmeta>")
            .build();
        let report = validate(&bare);
        assert!(!report.red_flags.iter().any(|f| f.layer == "XMP AI Markers"));

        let with_context = context()
            .tag("Make", "Google")
            .tag("Model", "Pixel 8")
            .xmp("<x:xmpmeta>gemini trainedAlgorithmicMedia</x:xmpmeta>")
            .build();
        let flagged = validate(&with_context);
        assert!(flagged.red_flags.iter().any(|f| f.layer == "XMP AI Markers"));
    }

    #[test]
    fn word_boundary_blocks_xmpmm_false_positive() {
        // "xmpmm" must not match the imagen pattern.
        let ctx = context()
            .tag("Make", "Canon")
            .tag("Model", "EOS R5")
            .xmp("<x:xmpmeta xmlns:xmpMM='ns' ai</x:xmpmeta>")
            .build();
        let report = validate(&ctx);
        assert!(!report.red_flags.iter().any(|f| f.layer == "XMP AI Markers"));
    }

    #[test]
    fn png_and_webp_formats_add_penalties() {
        use crate::loader::ImageFormat;
        let png = context().format(ImageFormat::Png).build();
        let webp = context().format(ImageFormat::Webp).build();
        let png_flag = validate(&png)
            .red_flags
            .iter()
            .find(|f| f.layer == "Format Validation")
            .map(|f| f.score);
        let webp_flag = validate(&webp)
            .red_flags
            .iter()
            .find(|f| f.layer == "Format Validation")
            .map(|f| f.score);
        assert_eq!(png_flag, Some(40));
        assert_eq!(webp_flag, Some(50));
    }

    #[test]
    fn score_is_clamped_to_bounds() {
        // Pile on every additive penalty.
        let ctx = context()
            .tag("Make", "Apple")
            .tag("Model", "iPhone 13")
            .tag("LensModel", "Canon EF 50mm")
            .tag("FNumber", "11")
            .tag("DateTimeOriginal", "2025:01:01 10:00:00")
            .tag("DateTime", "2025:01:03 10:00:00")
            .build();
        let report = validate(&ctx);
        assert!(report.fraud_score <= 100);
        assert_eq!(report.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn red_flags_follow_layer_order() {
        let ctx = context()
            .tag("Make", "Apple")
            .tag("Model", "iPhone 13")
            .tag("LensModel", "Canon EF 50mm")
            .build();
        let report = validate(&ctx);
        let layers: Vec<&str> = report.red_flags.iter().map(|f| f.layer.as_str()).collect();
        let apple = layers.iter().position(|l| *l == "Apple Hardware Token");
        let lens = layers.iter().position(|l| *l == "Lens Consistency");
        assert!(apple.unwrap() < lens.unwrap());
    }
}
