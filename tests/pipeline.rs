//! End-to-end tests: PNG files on disk through pairing, decoding, blocking
//! detection and reporting.

use std::fs;
use std::path::Path;

use artifact_eval::decode::{encode_rgb_png, load_image};
use artifact_eval::report::write_csv_file;
use artifact_eval::{
    AnalysisConfig, BlockingReport, LabImage, PixelwiseRegionProvider, RegionProvider,
    blocking_strength, detect_blocking, discover_pairs, lab_mse, lab_shift,
};
use imgref::ImgVec;
use rgb::RGB8;

const SIZE: usize = 32;

fn gray(v: u8) -> RGB8 {
    RGB8::new(v, v, v)
}

/// Gray checkerboard of 100 / 150.
fn textured() -> ImgVec<RGB8> {
    let pixels = (0..SIZE * SIZE)
        .map(|i| if (i % SIZE + i / SIZE) % 2 == 0 { gray(100) } else { gray(150) })
        .collect();
    ImgVec::new(pixels, SIZE, SIZE)
}

/// Copy of `img` with the 16x16 block at (8, 8) replaced by flat gray 200.
fn flattened(img: &ImgVec<RGB8>) -> ImgVec<RGB8> {
    let mut out = img.clone();
    for y in 8..24usize {
        for x in 8..24usize {
            out[(x, y)] = gray(200);
        }
    }
    out
}

fn write_png(path: &Path, img: &ImgVec<RGB8>) {
    fs::write(path, encode_rgb_png(img).unwrap()).unwrap();
}

#[test]
fn blocking_detected_from_files() {
    let root = tempfile::tempdir().unwrap();
    let ref_dir = root.path().join("ref");
    let dist_dir = root.path().join("dist");
    fs::create_dir_all(&ref_dir).unwrap();
    fs::create_dir_all(&dist_dir).unwrap();

    let reference = textured();
    write_png(&ref_dir.join("tile.png"), &reference);
    write_png(&dist_dir.join("tile_q10.png"), &flattened(&reference));
    write_png(&dist_dir.join("tile_q90.png"), &reference);

    let pairs = discover_pairs(&ref_dir, &dist_dir).unwrap();
    assert_eq!(pairs.len(), 2);

    let config = AnalysisConfig::default();
    let mut rows = Vec::new();
    for pair in &pairs {
        let dist_rgb = load_image(&pair.distorted).unwrap();
        let ref_lab = LabImage::from_rgb8(&load_image(&pair.reference).unwrap());
        let dist_lab = LabImage::from_rgb8(&dist_rgb);
        let analysis = detect_blocking(&ref_lab, &dist_lab, &config.blocking).unwrap();

        if pair.distorted_name() == "tile_q10.png" {
            assert_eq!(analysis.classified.len(), 1);
            assert_eq!(analysis.artifact_pixels, 256);
            let r = analysis.classified[0].region;
            assert_eq!((r.min_col, r.max_col, r.min_row, r.max_row), (8, 23, 8, 23));
        } else {
            assert_eq!(analysis.artifact_pixels, 0);
            let shift = lab_shift(&ref_lab, &dist_lab).unwrap();
            assert!((shift.l.slope - 1.0).abs() < 1e-6);
            assert!(shift.l.offset.abs() < 1e-4);
        }

        let strength = blocking_strength(&dist_rgb, &config.strength).unwrap();
        let report = BlockingReport::new(
            pair.reference_name(),
            pair.distorted_name(),
            &analysis,
            &config.blocking,
        )
        .with_lab_mse(lab_mse(&ref_lab, &dist_lab).unwrap())
        .with_blocking_strength(strength);
        rows.push(report.csv_row());
    }

    let csv_path = root.path().join("out.csv");
    write_csv_file(&rows, &csv_path).unwrap();
    let text = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("tile_q10.png"));
}

#[test]
fn blocking_strength_from_decoded_images() {
    let root = tempfile::tempdir().unwrap();
    let blocky_path = root.path().join("blocky.png");
    let fine_path = root.path().join("fine.png");
    // 8x8 blocks of 100 / 104, the shape a coarse quantizer leaves behind
    let blocky = ImgVec::new(
        (0..SIZE * SIZE)
            .map(|i| {
                let (x, y) = (i % SIZE, i / SIZE);
                if (x / 8 + y / 8) % 2 == 0 { gray(100) } else { gray(104) }
            })
            .collect(),
        SIZE,
        SIZE,
    );
    write_png(&blocky_path, &blocky);
    write_png(&fine_path, &textured());

    let config = AnalysisConfig::default();
    let blocky = blocking_strength(&load_image(&blocky_path).unwrap(), &config.strength).unwrap();
    let fine = blocking_strength(&load_image(&fine_path).unwrap(), &config.strength).unwrap();
    assert!(blocky.strength > 7.0, "{blocky:?}");
    assert_eq!(fine.strength, 0.0);
}

#[test]
fn region_masks_from_decoded_image() {
    let mut img = textured();
    // left half flat
    for y in 0..SIZE {
        for x in 0..SIZE / 2 {
            img[(x, y)] = gray(120);
        }
    }
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("half.png");
    write_png(&path, &img);

    let lab = LabImage::from_rgb8(&load_image(&path).unwrap());
    let masks = PixelwiseRegionProvider::default().compute_regions(&lab.l).unwrap();
    let (flat, mid, detail) = masks.counts();
    assert_eq!(flat + mid + detail, SIZE * SIZE);
    assert_eq!(masks.flat[(2usize, 16usize)], 255);
}

#[test]
fn config_file_overrides_defaults() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("cfg.json");
    fs::write(&path, r#"{ "blocking": { "classifier": { "min_area": 1000 } } }"#).unwrap();
    let config = AnalysisConfig::from_json_file(&path).unwrap();
    assert_eq!(config.blocking.classifier.min_area, 1000);

    // the 16x16 block is now too small to count
    let reference = textured();
    let analysis = detect_blocking(
        &LabImage::from_rgb8(&reference),
        &LabImage::from_rgb8(&flattened(&reference)),
        &config.blocking,
    )
    .unwrap();
    assert!(analysis.candidate_pixels > 0);
    assert_eq!(analysis.artifact_pixels, 0);
}
