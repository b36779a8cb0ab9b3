//! ICC color-profile sub-check
//!
//! The embedded color profile is a provenance fingerprint: cameras embed
//! vendor calibration, monitors betray screenshots, editors leave their
//! working-space profiles, and generators either omit the profile or ship
//! bare sRGB.

use super::SubCheck;
use crate::config::camera_brand;
use crate::detect::AnalysisContext;
use crate::icc;
use tracing::debug;

pub(crate) fn check(ctx: &AnalysisContext, claimed_camera: Option<&str>) -> SubCheck {
    let mut sub = SubCheck::clean("icc_profile");

    let Some(profile_bytes) = ctx.icc_profile.as_deref() else {
        sub.notes
            .push("Missing ICC profile (suspicious for camera photo)".into());
        sub.score += 15;
        return sub;
    };

    let Some(summary) = icc::inspect(profile_bytes) else {
        sub.notes.push("Corrupted or invalid ICC profile".into());
        sub.score += 25;
        return sub;
    };

    debug!(
        description = summary.description.as_deref().unwrap_or("-"),
        version = summary.version.as_deref().unwrap_or("-"),
        size = summary.size,
        "ICC profile inspected"
    );

    let description = summary.description.clone().unwrap_or_default();
    let description_lower = description.to_lowercase();
    let tables = &ctx.config.tables;

    if tables
        .icc_monitor_profiles
        .iter()
        .any(|k| description_lower.contains(&k.to_lowercase()))
        && !description_lower.contains("display p3")
    {
        sub.notes.push(format!(
            "Monitor ICC profile detected: {description} - indicates screenshot"
        ));
        sub.score += 40;
    }

    if tables
        .icc_editing_profiles
        .iter()
        .any(|p| description_lower.contains(&p.to_lowercase()))
        && (description_lower.contains("photoshop") || description_lower.contains("adobe"))
    {
        sub.notes.push(format!(
            "Editing software ICC profile: {description} - photo was edited"
        ));
        sub.score += 25;
    }

    if let Some(camera) = claimed_camera {
        if let Some(brand) = camera_brand(&camera.to_lowercase()) {
            if let Some(expected) = tables.icc_camera_profiles.get(brand) {
                let matches = expected
                    .description_contains
                    .iter()
                    .any(|fragment| description_lower.contains(&fragment.to_lowercase()));
                if !matches {
                    sub.notes.push(format!(
                        "Camera/ICC mismatch: EXIF claims '{camera}' but ICC profile is '{description}'"
                    ));
                    sub.score += 35;
                }
            }
        }
    }

    if is_generic_srgb(&description_lower) {
        sub.notes
            .push("Generic sRGB profile without vendor tags - possible AI generation".into());
        // Low weight: bare sRGB is also common in older cameras.
        sub.score += 10;
    }

    if summary.size < 300 {
        sub.notes.push(format!(
            "Suspiciously small ICC profile ({} bytes) - possibly stripped or fake",
            summary.size
        ));
        sub.score += 20;
    } else if summary.size > 1_000_000 {
        sub.notes.push(format!(
            "Unusually large ICC profile ({} bytes) - suspicious",
            summary.size
        ));
        sub.score += 15;
    }

    sub
}

/// Bare sRGB with no vendor wording at all.
fn is_generic_srgb(description_lower: &str) -> bool {
    const VENDOR_WORDS: [&str; 8] = [
        "apple", "display p3", "adobe", "canon", "nikon", "sony", "samsung", "google",
    ];
    description_lower.contains("srgb")
        && !VENDOR_WORDS.iter().any(|w| description_lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testctx::context;
    use crate::icc::synthetic_profile;

    #[test]
    fn missing_profile_gets_small_penalty() {
        let ctx = context().build();
        let sub = check(&ctx, None);
        assert_eq!(sub.score, 15);
    }

    #[test]
    fn monitor_profile_is_heavily_penalized() {
        let profile = synthetic_profile("Dell U2719D", (2, 4), (2020, 1, 1));
        let ctx = context().icc(profile).build();
        let sub = check(&ctx, None);
        assert!(sub.notes.iter().any(|n| n.contains("Monitor ICC profile")));
        assert!(sub.score >= 40);
    }

    #[test]
    fn display_p3_matches_claimed_iphone() {
        let profile = synthetic_profile("Display P3", (4, 0), (2017, 7, 7));
        let ctx = context().icc(profile).build();
        let sub = check(&ctx, Some("iPhone 13"));
        assert!(!sub.notes.iter().any(|n| n.contains("mismatch")));
    }

    #[test]
    fn srgb_on_claimed_iphone_is_a_mismatch() {
        let profile = synthetic_profile("sRGB IEC61966-2.1", (2, 1), (2015, 1, 1));
        let ctx = context().icc(profile).build();
        let sub = check(&ctx, Some("iPhone 13"));
        assert!(sub.notes.iter().any(|n| n.contains("Camera/ICC mismatch")));
        // Also generic sRGB, which stacks a small extra penalty.
        assert!(sub.score >= 45);
    }

    #[test]
    fn unreadable_profile_is_flagged_as_corrupted() {
        let mut profile = synthetic_profile("x", (2, 0), (2020, 1, 1));
        profile.truncate(100);
        let ctx = context().icc(profile).build();
        let sub = check(&ctx, None);
        // Too short to even inspect: corrupted.
        assert_eq!(sub.score, 25);
    }

    #[test]
    fn adobe_rgb_editing_profile_is_flagged() {
        let profile = synthetic_profile("Adobe RGB (1998)", (2, 1), (2000, 8, 11));
        let ctx = context().icc(profile).build();
        let sub = check(&ctx, None);
        assert!(sub.notes.iter().any(|n| n.contains("Editing software ICC profile")));
    }
}
