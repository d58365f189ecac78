use std::collections::BTreeSet;

use glam::DVec3;
use murmuration_lib::model::grid::Grid;
use murmuration_lib::model::state::Dimensions;
use proptest::prelude::*;

prop_compose! {
    fn arb_point()(
        x in -2.5f64..2.5,
        y in -2.5f64..2.5,
        z in -2.5f64..2.5
    ) -> DVec3 {
        DVec3::new(x, y, z)
    }
}

prop_compose! {
    fn arb_points(max: usize)(points in prop::collection::vec(arb_point(), 1..max)) -> Vec<DVec3> {
        points
    }
}

fn cell_contents(grid: &Grid) -> Vec<(usize, BTreeSet<usize>)> {
    grid.occupied_cells()
        .map(|cell| (cell.key, cell.members.iter().copied().collect()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_range_query_has_no_false_negatives(
        points in arb_points(120),
        divisions in 1usize..20,
        radius in 0.01f64..1.5
    ) {
        let mut grid = Grid::new(4.0, divisions, Dimensions::Three);
        grid.rebuild(&points);

        for (id, p) in points.iter().enumerate() {
            let found: BTreeSet<_> = grid.range_query(id, radius).into_iter().collect();
            prop_assert!(!found.contains(&id), "query for {} returned itself", id);
            for (other, q) in points.iter().enumerate() {
                if other != id && p.distance(*q) < radius - 1e-9 {
                    prop_assert!(found.contains(&other),
                        "particle {} at distance {} missing from query of {} (r={})",
                        other, p.distance(*q), id, radius);
                }
            }
        }
    }

    #[test]
    fn test_exact_query_matches_brute_force(
        points in arb_points(80),
        divisions in 1usize..16,
        radius in 0.05f64..1.0
    ) {
        let mut grid = Grid::new(4.0, divisions, Dimensions::Three);
        grid.rebuild(&points);

        for (id, p) in points.iter().enumerate() {
            let found: BTreeSet<_> = grid.range_query_exact(id, radius).into_iter().collect();
            let expected: BTreeSet<_> = points
                .iter()
                .enumerate()
                .filter(|&(other, q)| other != id && p.distance_squared(*q) <= radius * radius)
                .map(|(other, _)| other)
                .collect();
            prop_assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_cell_bounds_contain_inserted_point(
        points in arb_points(60),
        divisions in 1usize..32
    ) {
        let mut grid = Grid::new(4.0, divisions, Dimensions::Three);
        grid.rebuild(&points);
        let eps = 1e-9;

        for (id, p) in points.iter().enumerate() {
            let cell = grid.cell_containing(id);
            prop_assert!(cell.members.contains(&id));
            let (min, max) = grid.cell_bounds(cell.index);
            // Points outside the world are clamped into the edge cell.
            let clamped = p.clamp(DVec3::splat(-2.0), DVec3::splat(2.0));
            prop_assert!(clamped.cmpge(min - eps).all() && clamped.cmple(max + eps).all(),
                "{:?} not inside cell {:?} bounds {:?}..{:?}", p, cell.index, min, max);
        }
    }

    #[test]
    fn test_rebuild_is_idempotent(points in arb_points(100), divisions in 1usize..16) {
        let mut grid = Grid::new(4.0, divisions, Dimensions::Three);
        grid.rebuild(&points);
        let first = cell_contents(&grid);
        grid.rebuild(&points);
        prop_assert_eq!(first, cell_contents(&grid));
    }

    #[test]
    fn test_every_particle_in_exactly_one_cell(points in arb_points(100), divisions in 1usize..16) {
        let mut grid = Grid::new(4.0, divisions, Dimensions::Three);
        grid.rebuild(&points);

        let mut seen = vec![0usize; points.len()];
        for cell in grid.occupied_cells() {
            for &id in cell.members {
                seen[id] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&n| n == 1));
    }
}

#[test]
fn test_two_dimensional_grid_has_single_layer() {
    let mut grid = Grid::new(4.0, 8, Dimensions::Two);
    grid.rebuild(&[DVec3::new(1.0, -1.0, 0.0), DVec3::new(-1.9, 1.9, 0.0)]);

    assert_eq!(grid.depth(), 1);
    assert_eq!(grid.cell_count(), 64);
    assert!(grid.occupied_cells().all(|cell| cell.index.z == 0));
    assert_eq!(grid.face_neighbors(grid.cell_containing(0).index).count(), 4);
}

#[test]
fn test_rebuild_replaces_previous_contents() {
    let mut grid = Grid::new(4.0, 4, Dimensions::Three);
    grid.rebuild(&[DVec3::splat(-1.5), DVec3::splat(1.5)]);
    grid.rebuild(&[DVec3::splat(0.5)]);

    assert_eq!(grid.len(), 1);
    assert_eq!(grid.occupied_count(), 1);
    assert_eq!(grid.cell_containing(0).members, &[0]);
}
