//! Integration tests for the high-level Rust API.
//!
//! Synthetic populations are built from random rotations, translations and
//! row shuffles of a known shape, so every recovered transform can be checked
//! against ground truth.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use morphalign::assignment::{Candidates, LinearAssignment};
use morphalign::core::AssignmentSolver;
use morphalign::shape::{center, centroid_size, normalize, rotate};
use morphalign::*;
use nalgebra::{DMatrix, Rotation3};
use rand::prelude::*;

fn random_rotation(rng: &mut StdRng) -> Rotation {
    let angles: [f64; 3] = [
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-1.4..1.4),
        rng.gen_range(-3.0..3.0),
    ];
    *Rotation3::from_euler_angles(angles[0], angles[1], angles[2]).matrix()
}

fn random_shape(rng: &mut StdRng, n: usize) -> PointSet {
    // Anisotropic spread keeps the principal axes well separated.
    PointSet::from_fn(n, 3, |_, c| {
        let spread = [3.0, 1.5, 0.6][c];
        rng.gen_range(-spread..spread)
    })
}

/// `rotate(shape, r)` with rows shuffled; returns the moved set and the order
/// used (`moved[k]` is `shape[order[k]] * r`).
fn shuffled_copy(rng: &mut StdRng, shape: &PointSet, r: &Rotation) -> (PointSet, Vec<usize>) {
    let rotated = rotate(shape, r);
    let mut order: Vec<usize> = (0..shape.nrows()).collect();
    order.shuffle(rng);
    let mut out = rotated.clone();
    for (k, &src) in order.iter().enumerate() {
        out.set_row(k, &rotated.row(src));
    }
    let shift: [f64; 3] = [
        rng.gen_range(-5.0..5.0),
        rng.gen_range(-5.0..5.0),
        rng.gen_range(-5.0..5.0),
    ];
    for mut row in out.row_iter_mut() {
        for (c, v) in row.iter_mut().enumerate() {
            *v += shift[c];
        }
    }
    (out, order)
}

#[test]
fn test_kabsch_recovers_known_rotation() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = random_shape(&mut rng, 12);
    let r = random_rotation(&mut rng);
    let b = rotate(&a, &r);
    let fitted = kabsch(&a, &b, Reflection::Forbid).unwrap();
    assert!((fitted - r).norm() < 1e-9);
    assert_relative_eq!((fitted.transpose() * fitted).trace(), 3.0, epsilon = 1e-9);
}

#[test]
fn test_assignment_identity_on_cheap_diagonal() {
    let n = 8;
    let cost = DMatrix::from_fn(n, n, |r, c| if r == c { r as f64 * 0.5 } else { 1e3 });
    let result = LinearAssignment::default()
        .solve(&cost, &Candidates::All)
        .unwrap();
    assert_eq!(result.permutation, Permutation::identity(n));
    assert_relative_eq!(result.cost, cost.trace(), epsilon = 1e-9);
}

#[test]
fn test_gpd_rotated_shuffled_triangle() {
    let a = PointSet::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    let rz = *Rotation3::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2).matrix();
    let rotated = rotate(&a, &rz);
    let mut b = rotated.clone();
    for (k, &src) in [2usize, 0, 1].iter().enumerate() {
        b.set_row(k, &rotated.row(src));
    }

    let result = gpd(&a, &b, None).unwrap();
    assert!(result.distance < 1e-9);
    assert_eq!(result.permutation.as_slice(), &[2, 0, 1]);
    assert!((result.rotation - rz.transpose()).norm() < 1e-9);
    assert_relative_eq!(result.rotation.determinant(), 1.0, epsilon = 1e-9);
    let aligned = apply_alignment(&center(&b), &result.rotation, &result.permutation).unwrap();
    assert!((aligned - center(&a)).norm() < 1e-9);
}

#[test]
fn test_gpd_recovers_random_shuffle() {
    let mut rng = StdRng::seed_from_u64(3);
    let x = random_shape(&mut rng, 25);
    let r = random_rotation(&mut rng);
    let (y, order) = shuffled_copy(&mut rng, &x, &r);

    let result = gpd(&x, &y, None).unwrap();
    assert_eq!(result.permutation.as_slice(), order.as_slice());
    assert!(result.distance < 1e-8);
    assert!((result.rotation - r.transpose()).norm() < 1e-8);
    assert!(result.converged);
}

#[test]
fn test_locgpd_distance_history_is_monotone() {
    let mut rng = StdRng::seed_from_u64(5);
    let x = random_shape(&mut rng, 30);
    let noisy = x.map(|v| v + rng.gen_range(-0.05..0.05));
    let r = random_rotation(&mut rng);
    let (y, _) = shuffled_copy(&mut rng, &noisy, &r);

    let result = locgpd(&x, &y, &Rotation::identity(), None).unwrap();
    assert!(result.iterations <= 1000);
    for pair in result.history.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "history {:?}", result.history);
    }
    let m = result.permutation.to_matrix();
    for i in 0..30 {
        assert_eq!(m.row(i).sum(), 1.0);
        assert_eq!(m.column(i).sum(), 1.0);
    }
}

#[test]
fn test_simplex_strategy_matches_exact_strategy() {
    let mut rng = StdRng::seed_from_u64(17);
    let x = random_shape(&mut rng, 10);
    let r = random_rotation(&mut rng);
    let (y, order) = shuffled_copy(&mut rng, &x, &r);

    let settings = CorrespondenceSettings {
        lp_strategy: LpStrategy::Simplex,
        ..Default::default()
    };
    let result = gpd(&x, &y, Some(settings)).unwrap();
    assert_eq!(result.permutation.as_slice(), order.as_slice());
    assert!(result.distance < 1e-8);
}

#[test]
fn test_globalization_matches_ground_truth() {
    let mut rng = StdRng::seed_from_u64(42);
    let base = random_shape(&mut rng, 20);
    let r1 = random_rotation(&mut rng);
    let r2 = random_rotation(&mut rng);
    let (s1, order1) = shuffled_copy(&mut rng, &base, &r1);
    let (s2, order2) = shuffled_copy(&mut rng, &base, &r2);
    let shapes = vec![base.clone(), s1, s2];

    let result = correspondence(&shapes, None, None).unwrap();
    assert!(result.failures.is_empty());
    let global = result.global.as_ref().unwrap();
    assert_eq!(global.base, 0);

    // shape t row k is base row order_t[k] rotated by r_t.
    for (index, order, truth) in [(1usize, &order1, &r1), (2, &order2, &r2)] {
        let g = &global.alignments[&index];
        assert_eq!(g.permutation.as_slice(), order.as_slice());
        assert!((g.rotation - truth.transpose()).norm() < 1e-8);
    }

    // The chain through the tree agrees with composing the edge alignments.
    let path = global.tree.path(0, 2).unwrap();
    let mut chained = GlobalAlignment::identity(20);
    for edge in path.windows(2) {
        let a = result.alignment(edge[0], edge[1]).unwrap();
        chained = chained.extend(&a.rotation, &a.permutation);
    }
    assert_eq!(chained.permutation, global.alignments[&2].permutation);
    assert!((chained.rotation - global.alignments[&2].rotation).norm() < 1e-12);
}

#[test]
fn test_correspondence_with_initial_rotations() {
    let mut rng = StdRng::seed_from_u64(8);
    let base = random_shape(&mut rng, 15);
    let r = random_rotation(&mut rng);
    let (moved, order) = shuffled_copy(&mut rng, &base, &r);

    let mut initial = BTreeMap::new();
    initial.insert((0, 1), r.transpose());
    let settings = CorrespondenceSettings {
        globalize: false,
        ..Default::default()
    };
    let result = correspondence(&[base, moved], Some(&initial), Some(settings)).unwrap();
    assert!(result.global.is_none());
    assert_eq!(result.permutation(0, 1).unwrap().as_slice(), order.as_slice());
    assert!(result.distances[(0, 1)] < 1e-8);
}

#[test]
fn test_gpa_converges_on_rigid_copies() {
    let mut rng = StdRng::seed_from_u64(21);
    let shape = random_shape(&mut rng, 10);
    let shapes: Vec<PointSet> = (0..6)
        .map(|_| {
            let r = random_rotation(&mut rng);
            let scale = rng.gen_range(0.5..3.0);
            let shift = rng.gen_range(-4.0..4.0);
            (rotate(&shape, &r) * scale).add_scalar(shift)
        })
        .collect();

    let result = run_gpa(&shapes, None).unwrap();
    assert!(result.converged);
    assert!(result.iterations <= 5);
    assert!(result.final_change < 1e-4);

    let (unit, _) = normalize(&shape).unwrap();
    let r = kabsch(&result.mean, &unit, Reflection::Forbid).unwrap();
    assert!((rotate(&result.mean, &r) - unit).norm() < 1e-8);
    for (k, size) in result.centroid_sizes.iter().enumerate() {
        assert_relative_eq!(*size, centroid_size(&shapes[k]), epsilon = 1e-12);
    }

    let pca = shape_pca(&result).unwrap();
    assert!(pca.variances.iter().all(|v| *v < 1e-12));
}

#[test]
fn test_mismatched_inputs_fail_fast() {
    let a = PointSet::zeros(5, 3);
    let b = PointSet::zeros(4, 3);
    assert!(matches!(gpd(&a, &b, None), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(
        correspondence(&[a.clone(), b.clone()], None, None),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(run_gpa(&[a, b], None), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_settings_load_from_json_file() {
    let dir = std::env::temp_dir().join("morphalign-settings-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("settings.json");
    std::fs::write(
        &path,
        r#"{ "correspondence": { "mirror": true, "max_iterations": 50 }, "gpa": { "use_scaling": false } }"#,
    )
    .unwrap();
    let settings = load_settings(&path).unwrap();
    assert!(settings.correspondence.mirror);
    assert_eq!(settings.correspondence.max_iterations, 50);
    assert!(!settings.gpa.use_scaling);
    assert_eq!(settings.gpa.max_iterations, 5);

    assert!(matches!(
        load_settings(&dir.join("missing.json")),
        Err(Error::Config(_))
    ));
}
