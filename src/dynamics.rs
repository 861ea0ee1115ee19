//! Initialization, satisfaction and relocation rules of the Schelling model.

use crate::error::WorldError;
use crate::model::{AgentType, Distribution, Grid, Satisfaction};
use crate::sampling::{RandomSource, VacancyList};

const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Occupied cells around a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighborhood {
    /// Non-empty neighbors.
    pub n_neighbors: usize,
    /// Neighbors of the same type as the evaluated cell.
    pub n_alike: usize,
}

/// Agents relocated during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    pub displaced_a: usize,
    pub displaced_b: usize,
}

impl StepReport {
    pub fn displaced(&self, agent: AgentType) -> usize {
        match agent {
            AgentType::TypeA => self.displaced_a,
            AgentType::TypeB => self.displaced_b,
            AgentType::Empty => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.displaced_a + self.displaced_b
    }

    fn record(&mut self, agent: AgentType) {
        match agent {
            AgentType::TypeA => self.displaced_a += 1,
            AgentType::TypeB => self.displaced_b += 1,
            AgentType::Empty => {}
        }
    }
}

/// Create a `side_len x side_len` grid populated according to `dist`.
///
/// Every cell starts empty; then, for each type in [`AgentType::ALL`] order,
/// `floor(n_cells * fraction)` agents are placed at random distinct cells.
/// Cells left over by rounding stay empty.
///
/// # Errors
/// Fails before any placement if the side length is zero, a fraction lies
/// outside `0.0..=1.0`, or the requested counts exceed the number of cells.
pub fn initialize_world<R: RandomSource + ?Sized>(
    side_len: usize,
    dist: &Distribution,
    rng: &mut R,
) -> Result<Grid, WorldError> {
    let mut grid = Grid::new(side_len)?;
    let n_cells = grid.n_cells();

    let mut counts = [0; AgentType::ALL.len()];
    for (count, agent) in counts.iter_mut().zip(AgentType::ALL) {
        let value = dist.fraction(agent);
        if !(0.0..=1.0).contains(&value) {
            return Err(WorldError::InvalidFraction { agent, value });
        }
        *count = (n_cells as f64 * value).floor() as usize;
    }

    let requested: usize = counts.iter().sum();
    if requested > n_cells {
        return Err(WorldError::OutOfCapacity {
            requested,
            capacity: n_cells,
        });
    }

    let mut vacancies = VacancyList::all(n_cells);
    for (count, agent) in counts.into_iter().zip(AgentType::ALL) {
        vacancies.populate(&mut grid, agent, count, rng)?;
    }

    Ok(grid)
}

/// Count the occupied and alike neighbors of `(row, col)`.
///
/// Positions outside the grid are skipped. An empty cell has no alike
/// neighbors since empty neighbors are never counted.
pub fn neighborhood(grid: &Grid, row: usize, col: usize) -> Neighborhood {
    let current = grid[(row, col)];
    let mut nbhd = Neighborhood::default();
    for (d_row, d_col) in MOORE_OFFSETS {
        let (Some(n_row), Some(n_col)) =
            (row.checked_add_signed(d_row), col.checked_add_signed(d_col))
        else {
            continue;
        };
        let Some(neighbor) = grid.get(n_row, n_col) else {
            continue;
        };
        if neighbor.is_empty() {
            continue;
        }
        nbhd.n_neighbors += 1;
        if neighbor == current {
            nbhd.n_alike += 1;
        }
    }
    nbhd
}

/// Decide whether the occupant of `(row, col)` is content with its neighbors.
///
/// An agent without neighbors is satisfied; otherwise the share of alike
/// neighbors must reach `threshold`, with equality counting as satisfied.
pub fn evaluate(grid: &Grid, row: usize, col: usize, threshold: f64) -> Satisfaction {
    if grid[(row, col)].is_empty() {
        return Satisfaction::NotApplicable;
    }
    let nbhd = neighborhood(grid, row, col);
    if nbhd.n_neighbors == 0 || nbhd.n_alike as f64 >= threshold * nbhd.n_neighbors as f64 {
        Satisfaction::Satisfied
    } else {
        Satisfaction::Unsatisfied
    }
}

/// Advance the grid by one generation.
///
/// All cells are evaluated against the grid as it was before the step.
/// Unsatisfied agents are then removed, and every removed agent is put back at
/// a random cell among the freed and previously empty ones, type A first.
///
/// # Errors
/// Rejects a threshold outside `0.0..=1.0` before touching any cell.
/// Returns [`WorldError::InvariantBroken`] if the vacancies run out.
pub fn advance_step<R: RandomSource + ?Sized>(
    grid: &mut Grid,
    threshold: f64,
    rng: &mut R,
) -> Result<StepReport, WorldError> {
    check_threshold(threshold)?;

    let snapshot: &Grid = grid;
    let verdicts: Vec<_> = (0..snapshot.n_cells())
        .map(|idx| {
            let (row, col) = snapshot.position(idx);
            evaluate(snapshot, row, col, threshold)
        })
        .collect();

    let mut report = StepReport::default();
    let mut vacancies = VacancyList::with_capacity(grid.n_cells());
    for (idx, verdict) in verdicts.into_iter().enumerate() {
        match verdict {
            Satisfaction::Satisfied => {}
            Satisfaction::NotApplicable => vacancies.push(idx),
            Satisfaction::Unsatisfied => {
                report.record(grid.cells()[idx]);
                grid.set_cell(idx, AgentType::Empty);
                vacancies.push(idx);
            }
        }
    }

    for agent in AgentType::OCCUPANTS {
        vacancies.populate(grid, agent, report.displaced(agent), rng)?;
    }

    Ok(report)
}

pub fn check_threshold(threshold: f64) -> Result<(), WorldError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(WorldError::OutOfRangeThreshold(threshold));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::AgentType::{Empty as E, TypeA as A, TypeB as B};
    use crate::sampling::Scripted;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn scenario() -> Grid {
        Grid::from_rows(&[[A, A, E], [E, B, E], [A, E, B]]).unwrap()
    }

    fn counts(grid: &Grid) -> [usize; 3] {
        AgentType::ALL.map(|agent| grid.count(agent))
    }

    #[test]
    fn scenario_center_is_unsatisfied() {
        let grid = scenario();
        assert_eq!(
            neighborhood(&grid, 1, 1),
            Neighborhood {
                n_neighbors: 4,
                n_alike: 1,
            }
        );
        assert_eq!(evaluate(&grid, 1, 1, 0.5), Satisfaction::Unsatisfied);
    }

    #[test]
    fn scenario_every_cell() {
        use crate::model::Satisfaction::{NotApplicable as NA, Satisfied as S, Unsatisfied as U};
        let grid = scenario();
        let expected = [[S, S, NA], [NA, U, NA], [U, NA, S]];
        for (row, verdicts) in expected.iter().enumerate() {
            for (col, &verdict) in verdicts.iter().enumerate() {
                assert_eq!(
                    evaluate(&grid, row, col, 0.5),
                    verdict,
                    "cell ({row}, {col})"
                );
            }
        }
    }

    #[test]
    fn empty_cell_is_not_applicable() {
        let grid = Grid::from_rows(&[[A, A, A], [A, E, A], [A, A, A]]).unwrap();
        assert_eq!(evaluate(&grid, 1, 1, 0.0), Satisfaction::NotApplicable);
        assert_eq!(evaluate(&grid, 1, 1, 1.0), Satisfaction::NotApplicable);
    }

    #[test]
    fn lone_agent_is_satisfied() {
        let grid = Grid::from_rows(&[[E, E, E], [E, B, E], [E, E, E]]).unwrap();
        assert_eq!(evaluate(&grid, 1, 1, 1.0), Satisfaction::Satisfied);

        let grid = Grid::from_rows(&[[A, E], [E, E]]).unwrap();
        assert_eq!(evaluate(&grid, 0, 0, 1.0), Satisfaction::Satisfied);

        let grid = Grid::from_rows(&[[B]]).unwrap();
        assert_eq!(evaluate(&grid, 0, 0, 1.0), Satisfaction::Satisfied);
    }

    #[test]
    fn equal_share_meets_threshold() {
        let grid = Grid::from_rows(&[[B, B, E], [A, B, A], [E, E, E]]).unwrap();
        assert_eq!(
            neighborhood(&grid, 1, 1),
            Neighborhood {
                n_neighbors: 4,
                n_alike: 2,
            }
        );
        assert_eq!(evaluate(&grid, 1, 1, 0.5), Satisfaction::Satisfied);
        assert_eq!(evaluate(&grid, 1, 1, 0.51), Satisfaction::Unsatisfied);
    }

    #[test]
    fn corner_sees_three_neighbors() {
        let grid = Grid::from_rows(&[[A, B, A], [A, A, B], [B, B, B]]).unwrap();
        assert_eq!(
            neighborhood(&grid, 2, 2),
            Neighborhood {
                n_neighbors: 3,
                n_alike: 2,
            }
        );
    }

    #[test]
    fn initialize_matches_distribution() {
        let dist = Distribution {
            type_a: 0.25,
            type_b: 0.25,
            empty: 0.5,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let grid = initialize_world(30, &dist, &mut rng).unwrap();
        assert_eq!(counts(&grid), [225, 225, 450]);
    }

    #[test]
    fn rounding_leftovers_stay_empty() {
        let dist = Distribution {
            type_a: 0.33,
            type_b: 0.33,
            empty: 0.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let grid = initialize_world(5, &dist, &mut rng).unwrap();
        assert_eq!(counts(&grid), [8, 8, 9]);
    }

    #[test]
    fn initialize_follows_draws() {
        let dist = Distribution {
            type_a: 0.5,
            type_b: 0.25,
            empty: 0.25,
        };
        // A takes 0 then 3, B takes 1, Empty takes 2.
        let mut rng = Scripted::new(&[0, 0, 1, 0]);
        let grid = initialize_world(2, &dist, &mut rng).unwrap();
        assert_eq!(grid, Grid::from_rows(&[[A, B], [E, A]]).unwrap());
    }

    #[test]
    fn initialize_rejects_bad_input() {
        let dist = Distribution {
            type_a: 0.6,
            type_b: 0.6,
            empty: 0.0,
        };
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        assert_eq!(
            initialize_world(10, &dist, &mut rng),
            Err(WorldError::OutOfCapacity {
                requested: 120,
                capacity: 100,
            })
        );
        assert_eq!(
            initialize_world(0, &dist, &mut rng),
            Err(WorldError::InvalidDimension(0))
        );

        let dist = Distribution {
            type_a: -0.1,
            type_b: 0.5,
            empty: 0.5,
        };
        assert_eq!(
            initialize_world(10, &dist, &mut rng),
            Err(WorldError::InvalidFraction {
                agent: A,
                value: -0.1,
            })
        );
    }

    #[test]
    fn step_relocates_unsatisfied_agents() {
        let mut grid = scenario();
        // Vacancies in scan order are [2, 3, 4, 5, 6, 7]. A draws slot 0 (cell 2),
        // leaving [7, 3, 4, 5, 6]; B draws slot 4 (cell 6).
        let mut rng = Scripted::new(&[0, 4]);
        let report = advance_step(&mut grid, 0.5, &mut rng).unwrap();
        assert_eq!(
            report,
            StepReport {
                displaced_a: 1,
                displaced_b: 1,
            }
        );
        assert_eq!(
            grid,
            Grid::from_rows(&[[A, A, A], [E, E, E], [B, E, B]]).unwrap()
        );
        assert!(rng.0.is_empty());
    }

    #[test]
    fn step_uses_pre_step_snapshot() {
        // Evicting (0,0) first must not change how (0,1) sees it.
        let mut grid = Grid::from_rows(&[[A, B], [B, E]]).unwrap();
        let mut rng = Scripted::new(&[0, 0, 0]);
        let report = advance_step(&mut grid, 1.0, &mut rng).unwrap();
        assert_eq!(
            report,
            StepReport {
                displaced_a: 1,
                displaced_b: 2,
            }
        );
        assert_eq!(counts(&grid), [1, 2, 1]);
    }

    #[test]
    fn satisfied_grid_is_unchanged() {
        let mut grid = Grid::from_rows(&[[A, A, E], [A, E, B], [E, B, B]]).unwrap();
        let before = grid.clone();
        let report = advance_step(&mut grid, 0.5, &mut Scripted::new(&[])).unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn step_rejects_bad_threshold() {
        let mut grid = scenario();
        for threshold in [-0.01, 1.5, f64::NAN] {
            let err = advance_step(&mut grid, threshold, &mut Scripted::new(&[])).unwrap_err();
            assert!(matches!(err, WorldError::OutOfRangeThreshold(_)));
        }
        assert_eq!(grid, scenario());
    }

    proptest! {
        #[test]
        fn step_conserves_counts(
            seed in any::<u64>(),
            side_len in 1usize..12,
            type_a in 0.0..=0.5f64,
            type_b in 0.0..=0.5f64,
            threshold in 0.0..=1.0f64,
        ) {
            let dist = Distribution { type_a, type_b, empty: 0.0 };
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let mut grid = initialize_world(side_len, &dist, &mut rng).unwrap();
            let before = counts(&grid);
            for _ in 0..4 {
                let report = advance_step(&mut grid, threshold, &mut rng).unwrap();
                prop_assert!(report.total() <= before[0] + before[1]);
                prop_assert_eq!(counts(&grid), before);
            }
        }

        #[test]
        fn neighborhood_stays_in_bounds(seed in any::<u64>(), side_len in 1usize..8) {
            let dist = Distribution { type_a: 0.4, type_b: 0.4, empty: 0.2 };
            let mut rng = ChaCha12Rng::seed_from_u64(seed);
            let grid = initialize_world(side_len, &dist, &mut rng).unwrap();
            for row in 0..side_len {
                for col in 0..side_len {
                    let nbhd = neighborhood(&grid, row, col);
                    prop_assert!(nbhd.n_alike <= nbhd.n_neighbors);
                    prop_assert!(nbhd.n_neighbors <= 8);
                }
            }
        }
    }
}
