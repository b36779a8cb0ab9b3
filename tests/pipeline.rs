//! End-to-end pipeline tests over synthetic image fixtures

mod common;

use common::*;
use pretty_assertions::assert_eq;
use veriframe::{Detail, Engine, Error, Mode, VerdictStatus};

#[tokio::test]
async fn verdict_and_confidence_are_always_valid() {
    let engine = Engine::new();
    let jpeg = jpeg_bytes(&textured_image(320, 240), 88);

    for mode in [Mode::Photo, Mode::Document] {
        let result = engine.verify(&jpeg, mode, Detail::Basic).await.unwrap();
        assert!(matches!(
            result.verdict,
            VerdictStatus::Real
                | VerdictStatus::AiGenerated
                | VerdictStatus::Manipulated
                | VerdictStatus::Inconclusive
        ));
        assert!((0.0..=1.0).contains(&result.confidence));
        assert!(!result.reason.is_empty());
    }
}

#[tokio::test]
async fn identical_input_yields_identical_verdict() {
    let engine = Engine::new();
    let jpeg = with_exif(
        &jpeg_bytes(&textured_image(320, 240), 85),
        &[(TAG_MAKE, "Canon"), (TAG_MODEL, "Canon EOS R5")],
    );

    let first = engine.verify(&jpeg, Mode::Document, Detail::Detailed).await.unwrap();
    let second = engine.verify(&jpeg, Mode::Document, Detail::Detailed).await.unwrap();

    assert_eq!(first.verdict, second.verdict);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.reason, second.reason);
    assert_eq!(
        first.metadata_validation.as_ref().map(|v| v.score),
        second.metadata_validation.as_ref().map(|v| v.score)
    );
}

#[tokio::test]
async fn unknown_container_is_a_fatal_error() {
    let engine = Engine::new();
    let result = engine
        .verify(b"GIF89a definitely not supported", Mode::Photo, Detail::Basic)
        .await;
    assert!(matches!(result, Err(Error::InvalidFormat(_))));
}

#[tokio::test]
async fn basic_detail_omits_per_detector_blocks() {
    let engine = Engine::new();
    let jpeg = jpeg_bytes(&textured_image(256, 192), 85);

    let basic = engine.verify(&jpeg, Mode::Photo, Detail::Basic).await.unwrap();
    assert!(basic.findings.is_none());
    assert!(basic.metadata.is_none());
    assert!(basic.metadata_validation.is_none());
    assert!(basic.fft_analysis.is_none());

    let json = serde_json::to_value(&basic).unwrap();
    let object = json.as_object().unwrap();
    assert!(object.contains_key("verdict"));
    assert!(object.contains_key("confidence"));
    assert!(object.contains_key("watermark_detected"));
    assert!(object.contains_key("processing_time_ms"));
    assert!(!object.contains_key("findings"));
    assert!(!object.contains_key("metadata_validation"));
}

#[tokio::test]
async fn detailed_response_carries_all_analysis_blocks() {
    let engine = Engine::new();
    let jpeg = with_exif(
        &jpeg_bytes(&textured_image(256, 192), 85),
        &[
            (TAG_MAKE, "Canon"),
            (TAG_MODEL, "Canon EOS R5"),
            (TAG_SOFTWARE, "Adobe Lightroom 7.1"),
            (TAG_DATETIME, "2025:03:14 09:26:53"),
        ],
    );

    let result = engine.verify(&jpeg, Mode::Document, Detail::Detailed).await.unwrap();

    let findings = result.findings.expect("heuristic findings");
    assert_eq!(findings.len(), 4);

    let metadata = result.metadata.expect("metadata block");
    assert_eq!(metadata.exif.get("Make").map(String::as_str), Some("Canon"));
    assert_eq!(metadata.format, "JPEG");
    assert_eq!(metadata.sha256.len(), 64);

    let validation = result.metadata_validation.expect("validation block");
    assert_eq!(validation.checks.len(), 11);
    assert!(validation
        .red_flags
        .iter()
        .any(|f| f.reason.contains("lightroom")));

    assert!(result.fft_analysis.is_some());
    assert!(result.face_swap_analysis.is_some());
    assert!(result.intrinsic_analysis.is_some());
    assert!(result.ai_signatures.is_some());
}

#[tokio::test]
async fn xmp_google_ai_marker_forces_ai_verdict() {
    let engine = Engine::new();
    let jpeg = with_xmp(
        &with_exif(
            &jpeg_bytes(&textured_image(256, 192), 85),
            &[(TAG_MAKE, "Google"), (TAG_MODEL, "Pixel 8")],
        ),
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">Edited with Google AI</x:xmpmeta>",
    );

    let result = engine.verify(&jpeg, Mode::Photo, Detail::Basic).await.unwrap();
    assert_eq!(result.verdict, VerdictStatus::AiGenerated);
    assert_eq!(result.confidence, 0.98);
    assert!(result.reason.to_lowercase().contains("google ai"));
}

#[tokio::test]
async fn c2pa_manifest_is_a_smoking_gun() {
    let engine = Engine::new();
    let jpeg = with_c2pa_manifest(&jpeg_bytes(&textured_image(256, 192), 85));

    let result = engine.verify(&jpeg, Mode::Photo, Detail::Basic).await.unwrap();
    assert!(result.watermark_detected);
    assert_eq!(result.verdict, VerdictStatus::AiGenerated);
    assert!(result.confidence >= 0.95);

    let analysis = result.watermark_analysis.expect("watermark analysis block");
    assert_eq!(analysis.kind, "c2pa");
}

#[tokio::test]
async fn png_upload_is_verified_not_rejected() {
    let engine = Engine::new();
    let png = png_bytes(&textured_image(256, 192));

    let result = engine.verify(&png, Mode::Document, Detail::Detailed).await.unwrap();
    let metadata = result.metadata.expect("metadata block");
    assert_eq!(metadata.format, "PNG");

    // The format layer must have flagged the PNG arrival.
    let validation = result.metadata_validation.expect("validation block");
    assert!(validation
        .red_flags
        .iter()
        .any(|f| f.layer == "Format Validation"));
}

#[tokio::test]
async fn photo_mode_never_scores_stricter_than_document_mode() {
    let engine = Engine::new();
    // EXIF-free JPEG: exactly what an EXIF-stripping channel delivers.
    let jpeg = jpeg_bytes(&textured_image(320, 240), 85);

    let photo = engine.verify(&jpeg, Mode::Photo, Detail::Detailed).await.unwrap();
    let document = engine.verify(&jpeg, Mode::Document, Detail::Detailed).await.unwrap();

    let photo_score = photo.metadata_validation.unwrap().score;
    let document_score = document.metadata_validation.unwrap().score;
    assert!(photo_score <= document_score);
}

#[tokio::test]
async fn gps_block_reaches_detailed_metadata() {
    // GPS requires a sub-IFD, exercised through the unit-level builder;
    // here we only pin that a GPS-free image reports no position.
    let engine = Engine::new();
    let jpeg = with_exif(
        &jpeg_bytes(&textured_image(256, 192), 85),
        &[(TAG_MAKE, "Canon"), (TAG_MODEL, "Canon EOS R5")],
    );
    let result = engine.verify(&jpeg, Mode::Document, Detail::Detailed).await.unwrap();
    assert!(result.metadata.unwrap().gps.is_none());
}

#[tokio::test]
async fn heic_container_still_produces_a_verdict() {
    // Minimal HEIC: ftyp + meta box with an embedded EXIF TIFF payload.
    let mut exif_item = b"\x00\x00\x00\x00Exif\x00\x00".to_vec();
    exif_item.extend_from_slice(&exif_payload(&[
        (TAG_MAKE, "Apple"),
        (TAG_MODEL, "iPhone 15 Pro"),
    ]));

    let mut meta_body = vec![0, 0, 0, 0]; // version + flags
    meta_body.extend_from_slice(&exif_item);
    let mut data = Vec::new();
    data.extend_from_slice(&16u32.to_be_bytes());
    data.extend_from_slice(b"ftypheic");
    data.extend_from_slice(b"mif1heic");
    data.extend_from_slice(&((meta_body.len() + 8) as u32).to_be_bytes());
    data.extend_from_slice(b"meta");
    data.extend_from_slice(&meta_body);

    let engine = Engine::new();
    let result = engine.verify(&data, Mode::Photo, Detail::Detailed).await.unwrap();

    // Pixel detectors degrade to terminal slots; metadata still parsed.
    let metadata = result.metadata.expect("metadata block");
    assert_eq!(metadata.exif.get("Make").map(String::as_str), Some("Apple"));
    assert_eq!(metadata.format, "HEIC");
    assert!(result.detector_errors.is_some());
    assert!((0.0..=1.0).contains(&result.confidence));
}
