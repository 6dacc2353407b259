//! End-to-end scenarios over small synthetic composites.

use approx::assert_relative_eq;
use covermap_algorithms::classification::{
    class_counts, evaluate, extract_samples, random_split, CartClassifier, Classifier,
    MinimumDistanceClassifier, SplitParams, TrainedClassifier,
};
use covermap_algorithms::imagery::tasseled_cap;
use covermap_algorithms::pipeline::{run_analysis, ClassInfo, SampleRect, StudyConfig};
use covermap_algorithms::statistics::{
    class_areas, covered_area, geographic_cell_area, SpheroidParams,
};
use covermap_core::io::{write_geotiff, BandSource, DateRange, GeoTiffBandSource};
use covermap_core::raster::{BandStack, GeoTransform, TM_BAND_NAMES};
use covermap_core::{Error, LabeledRegion, CRS};
use std::path::PathBuf;

const X0: f64 = 500_000.0;
const Y0: f64 = 1_000_000.0;
const PIXEL: f64 = 30.0;

/// Lower-left corner and pixel size (degrees) of the lon/lat scenes
const LON0: f64 = 104.70;
const LAT0: f64 = 8.60;
const DEG: f64 = 0.00027;

const WATER: [f64; 6] = [0.08, 0.06, 0.04, 0.02, 0.01, 0.005];
const VEGETATION: [f64; 6] = [0.03, 0.05, 0.03, 0.40, 0.20, 0.08];
const AQUACULTURE: [f64; 6] = [0.07, 0.08, 0.08, 0.10, 0.06, 0.04];
const BARE: [f64; 6] = [0.15, 0.18, 0.20, 0.25, 0.30, 0.25];

/// UTM 48N composite of 30 m pixels with its lower-left corner at (X0, Y0)
fn composite(rows: usize, cols: usize, pixel: impl Fn(usize, usize) -> [f64; 6]) -> BandStack {
    let mut stack = BandStack::new(&TM_BAND_NAMES, rows, cols);
    stack.set_transform(GeoTransform::new(X0, Y0 + rows as f64 * PIXEL, PIXEL, -PIXEL));
    stack.set_crs(Some(CRS::from_epsg(32648)));
    for r in 0..rows {
        for c in 0..cols {
            stack.set_pixel(r, c, &pixel(r, c)).unwrap();
        }
    }
    stack
}

/// Rectangle of `rows` x `cols` pixel centers starting at pixel (row, col)
/// of a grid with `total_rows` rows
fn pixel_rect(total_rows: usize, row: usize, col: usize, rows: usize, cols: usize) -> [f64; 4] {
    let top = Y0 + total_rows as f64 * PIXEL;
    [
        X0 + col as f64 * PIXEL + 5.0,
        top - (row + rows) as f64 * PIXEL + 5.0,
        X0 + (col + cols) as f64 * PIXEL - 5.0,
        top - row as f64 * PIXEL - 5.0,
    ]
}

fn study(rows: usize, cols: usize, samples: Vec<SampleRect>, split: SplitParams) -> StudyConfig {
    StudyConfig {
        name: "synthetic".into(),
        region: [X0, Y0, X0 + cols as f64 * PIXEL, Y0 + rows as f64 * PIXEL],
        dates: DateRange::new("2004-01-01", "2005-12-31"),
        classes: ["aquaculture", "water", "vegetation"]
            .iter()
            .enumerate()
            .map(|(i, name)| ClassInfo {
                label: i as u8,
                name: name.to_string(),
            })
            .collect(),
        samples,
        split,
    }
}

fn two_by_two() -> BandStack {
    composite(2, 2, |r, c| match (r, c) {
        (0, 0) => AQUACULTURE,
        (0, 1) => WATER,
        (1, 0) => VEGETATION,
        _ => BARE,
    })
}

#[test]
fn two_by_two_nearest_mean_end_to_end() {
    let stack = two_by_two();
    let samples = vec![
        SampleRect { label: 0, rect: pixel_rect(2, 0, 0, 1, 1) },
        SampleRect { label: 1, rect: pixel_rect(2, 0, 1, 1, 1) },
        SampleRect { label: 2, rect: pixel_rect(2, 1, 0, 1, 1) },
    ];
    let split = SplitParams { train_fraction: 1.0, seed: Some(1) };
    let study = study(2, 2, samples, split);

    // Step by step: every training pixel is predicted as its own class
    let features = tasseled_cap(&stack, &study.region_polygon()).unwrap();
    assert_eq!(features.shape(), (2, 2));
    let extracted = extract_samples(&features, &study.labeled_regions().unwrap()).unwrap();
    assert_eq!(extracted.len(), 3);
    let split = random_split(extracted.clone(), &study.split).unwrap();
    assert_eq!(split.training.len(), 3);
    assert!(split.testing.is_empty());

    let model = MinimumDistanceClassifier.train(&split.training, &[0, 1, 2]).unwrap();
    for s in &extracted {
        assert_eq!(model.predict(&s.features).unwrap(), s.label);
    }

    // Whole pipeline
    let output = run_analysis(&stack, &study, &MinimumDistanceClassifier).unwrap();
    assert_eq!(output.report.n_training, 3);
    assert_eq!(output.report.n_testing, 0);
    assert_eq!(output.report.overall_accuracy, None);
    assert_eq!(output.classified.get(0, 0).unwrap(), 0);
    assert_eq!(output.classified.get(0, 1).unwrap(), 1);
    assert_eq!(output.classified.get(1, 0).unwrap(), 2);

    let total: f64 = output.report.areas.iter().map(|a| a.area_m2).sum();
    assert_relative_eq!(total, 4.0 * PIXEL * PIXEL, epsilon = 1e-6);
    assert_relative_eq!(
        total,
        covered_area(&output.classified, &study.region_polygon()).unwrap(),
        epsilon = 1e-6
    );
}

/// 10 x 12 scene: four-column bands of aquaculture, water, vegetation
fn striped() -> BandStack {
    composite(10, 12, |_, c| match c / 4 {
        0 => AQUACULTURE,
        1 => WATER,
        _ => VEGETATION,
    })
}

fn striped_regions() -> Vec<LabeledRegion> {
    [(0u8, 0usize), (1, 4), (2, 8)]
        .iter()
        .map(|&(label, col)| {
            let [x0, y0, x1, y1] = pixel_rect(10, 2, col, 5, 4);
            LabeledRegion::rectangle(x0, y0, x1, y1, label)
        })
        .collect()
}

#[test]
fn perfect_classifier_has_clean_confusion_matrix() {
    let stack = striped();
    let region = covermap_core::vector::rectangle(X0, Y0, X0 + 360.0, Y0 + 300.0);
    let features = tasseled_cap(&stack, &region).unwrap();
    let samples = extract_samples(&features, &striped_regions()).unwrap();
    assert_eq!(samples.len(), 60);

    let split = random_split(samples, &SplitParams { train_fraction: 0.6, seed: Some(11) }).unwrap();
    let model = CartClassifier::default().train(&split.training, &[0, 1, 2]).unwrap();
    let matrix = evaluate(&split.testing, &model, &[0, 1, 2]).unwrap();

    assert_eq!(matrix.total(), split.testing.len());
    assert_eq!(matrix.overall_accuracy(), Some(1.0));
    for &a in matrix.labels() {
        for &p in matrix.labels() {
            if a != p {
                assert_eq!(matrix.get(a, p), Some(0));
            }
        }
    }

    // Row sums are the test support of each class
    for (label, n) in class_counts(&split.testing) {
        assert_eq!(matrix.row_total(label), Some(n));
    }
}

#[test]
fn class_areas_conserve_region_area() {
    let stack = striped();
    let mut samples = Vec::new();
    for (label, col) in [(0u8, 0usize), (1, 4), (2, 8)] {
        samples.push(SampleRect { label, rect: pixel_rect(10, 2, col, 5, 4) });
    }
    let study = study(10, 12, samples, SplitParams { train_fraction: 0.6, seed: Some(3) });
    let output = run_analysis(&stack, &study, &CartClassifier::default()).unwrap();

    // Inner region: rows 1..9, cols 2..10
    let inner = covermap_core::vector::rectangle(X0 + 60.0, Y0 + 30.0, X0 + 300.0, Y0 + 270.0);
    let areas = class_areas(&output.classified, &[0, 1, 2], &inner).unwrap();
    let sum: f64 = areas.iter().map(|a| a.area_m2).sum();
    assert_relative_eq!(sum, covered_area(&output.classified, &inner).unwrap(), epsilon = 1e-6);
    assert_relative_eq!(sum, 64.0 * PIXEL * PIXEL, epsilon = 1e-6);

    // Stripes are cut 2 / 4 / 2 columns wide
    assert_relative_eq!(areas[0].area_m2, 16.0 * PIXEL * PIXEL, epsilon = 1e-6);
    assert_relative_eq!(areas[1].area_m2, 32.0 * PIXEL * PIXEL, epsilon = 1e-6);
    assert_relative_eq!(areas[2].area_m2, 16.0 * PIXEL * PIXEL, epsilon = 1e-6);
}

#[test]
fn sample_rect_between_centers_is_ignored() {
    let stack = two_by_two();
    let samples = vec![
        SampleRect { label: 0, rect: pixel_rect(2, 0, 0, 1, 1) },
        SampleRect { label: 1, rect: pixel_rect(2, 0, 1, 1, 1) },
        SampleRect { label: 2, rect: pixel_rect(2, 1, 0, 1, 1) },
        // 10 m square in the corner of pixel (1, 1), away from its center
        SampleRect { label: 1, rect: [X0 + 32.0, Y0 + 2.0, X0 + 42.0, Y0 + 12.0] },
    ];
    let study = study(2, 2, samples, SplitParams { train_fraction: 1.0, seed: Some(0) });
    let output = run_analysis(&stack, &study, &MinimumDistanceClassifier).unwrap();
    assert_eq!(output.report.n_samples, 3);
}

#[test]
fn overlapping_labels_abort_the_run() {
    let stack = two_by_two();
    let samples = vec![
        SampleRect { label: 0, rect: pixel_rect(2, 0, 0, 1, 2) },
        SampleRect { label: 1, rect: pixel_rect(2, 0, 1, 1, 1) },
        SampleRect { label: 2, rect: pixel_rect(2, 1, 0, 1, 1) },
    ];
    let study = study(2, 2, samples, SplitParams { train_fraction: 1.0, seed: Some(0) });
    let err = run_analysis(&stack, &study, &MinimumDistanceClassifier).unwrap_err();
    assert!(matches!(
        err,
        Error::OverlapConflict { row: 0, col: 1, first_label: 0, second_label: 1, .. }
    ));
}

#[test]
fn missing_class_aborts_the_run() {
    let stack = two_by_two();
    let samples = vec![
        SampleRect { label: 0, rect: pixel_rect(2, 0, 0, 1, 1) },
        SampleRect { label: 1, rect: pixel_rect(2, 0, 1, 1, 1) },
    ];
    let study = study(2, 2, samples, SplitParams { train_fraction: 1.0, seed: Some(0) });
    let err = run_analysis(&stack, &study, &CartClassifier::default()).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { ref missing } if missing == &vec![2]));
}

#[test]
fn seeded_pipeline_is_reproducible() {
    let stack = striped();
    let mut samples = Vec::new();
    for (label, col) in [(0u8, 0usize), (1, 4), (2, 8)] {
        samples.push(SampleRect { label, rect: pixel_rect(10, 2, col, 5, 4) });
    }
    let study = study(10, 12, samples, SplitParams { train_fraction: 0.6, seed: Some(42) });
    let a = run_analysis(&stack, &study, &CartClassifier::default()).unwrap();
    let b = run_analysis(&stack, &study, &CartClassifier::default()).unwrap();
    assert_eq!(a.report, b.report);
}

/// WGS84 lon/lat twin of [`striped`], near the Ca Mau peninsula
fn striped_geographic() -> BandStack {
    let mut stack = BandStack::new(&TM_BAND_NAMES, 10, 12);
    stack.set_transform(GeoTransform::new(LON0, LAT0 + 10.0 * DEG, DEG, -DEG));
    stack.set_crs(Some(CRS::wgs84()));
    for r in 0..10 {
        for c in 0..12 {
            let pixel = match c / 4 {
                0 => AQUACULTURE,
                1 => WATER,
                _ => VEGETATION,
            };
            stack.set_pixel(r, c, &pixel).unwrap();
        }
    }
    stack
}

fn geographic_study() -> StudyConfig {
    let inset = DEG / 6.0;
    let top = LAT0 + 10.0 * DEG;
    let samples = [(0u8, 0usize), (1, 4), (2, 8)]
        .iter()
        .map(|&(label, col)| SampleRect {
            label,
            rect: [
                LON0 + col as f64 * DEG + inset,
                top - 7.0 * DEG + inset,
                LON0 + (col + 4) as f64 * DEG - inset,
                top - 2.0 * DEG - inset,
            ],
        })
        .collect();
    StudyConfig {
        region: [LON0, LAT0, LON0 + 12.0 * DEG, LAT0 + 10.0 * DEG],
        ..study(10, 12, samples, SplitParams { train_fraction: 0.6, seed: Some(5) })
    }
}

/// Ground area of `cols` pixels in each of the 10 rows of the lon/lat scene
fn geographic_columns_area(cols: usize) -> f64 {
    let params = SpheroidParams::default();
    (0..10)
        .map(|row| {
            let lat = LAT0 + 10.0 * DEG - (row as f64 + 0.5) * DEG;
            cols as f64 * geographic_cell_area(lat, DEG, DEG, &params)
        })
        .sum()
}

#[test]
fn geographic_areas_follow_latitude() {
    let stack = striped_geographic();
    let study = geographic_study();
    let output = run_analysis(&stack, &study, &CartClassifier::default()).unwrap();
    assert_eq!(output.classified.shape(), (10, 12));

    let region = study.region_polygon();
    let sum: f64 = output.report.areas.iter().map(|a| a.area_m2).sum();
    assert_relative_eq!(sum, covered_area(&output.classified, &region).unwrap(), epsilon = 1e-6);
    assert_relative_eq!(sum, geographic_columns_area(12), max_relative = 1e-9);

    // ~29.7 m x ~29.85 m cells, not the nominal 30 m
    let nominal = 120.0 * PIXEL * PIXEL;
    assert!((sum - nominal).abs() > 1.0, "{sum} vs {nominal}");
    assert!(sum < nominal);

    let areas = class_areas(&output.classified, &[0, 1, 2], &region).unwrap();
    assert_relative_eq!(areas[0].area_m2, geographic_columns_area(4), max_relative = 1e-9);
    assert_relative_eq!(areas[1].area_m2, geographic_columns_area(4), max_relative = 1e-9);
    assert_relative_eq!(areas[2].area_m2, geographic_columns_area(4), max_relative = 1e-9);
}

#[test]
fn geotiff_composite_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let stack = striped_geographic();
    let paths: Vec<PathBuf> = TM_BAND_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let path = dir.path().join(format!("{}.tif", name));
            write_geotiff(&stack.band_raster(i).unwrap(), &path).unwrap();
            path
        })
        .collect();

    let study = geographic_study();
    let source = GeoTiffBandSource::new(paths).unwrap();
    let fetched = source.fetch(study.bounds(), &study.dates).unwrap();
    assert_eq!(fetched.shape(), (10, 12));
    assert_eq!(fetched.crs().and_then(CRS::epsg), Some(4326));
    assert_relative_eq!(fetched.transform().origin_x, LON0, epsilon = 1e-9);
    assert_relative_eq!(fetched.transform().origin_y, LAT0 + 10.0 * DEG, epsilon = 1e-9);

    let from_files = run_analysis(&fetched, &study, &CartClassifier::default()).unwrap();
    let in_memory = run_analysis(&stack, &study, &CartClassifier::default()).unwrap();
    assert_eq!(from_files.report.n_samples, 60);
    assert_eq!(
        from_files.classified.data().iter().collect::<Vec<_>>(),
        in_memory.classified.data().iter().collect::<Vec<_>>()
    );
    for (a, b) in from_files.report.areas.iter().zip(&in_memory.report.areas) {
        assert_eq!(a.label, b.label);
        assert_relative_eq!(a.area_m2, b.area_m2, max_relative = 1e-9);
    }
}
