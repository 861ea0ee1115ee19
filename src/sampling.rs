use crate::error::WorldError;
use crate::model::{AgentType, Grid};
use rand::Rng;
use rand_chacha::ChaCha12Rng;

/// Source of uniform random indices.
pub trait RandomSource {
    /// Draw an index uniformly from `0..n`. `n` must be positive.
    fn draw_index(&mut self, n: usize) -> usize;
}

impl RandomSource for ChaCha12Rng {
    fn draw_index(&mut self, n: usize) -> usize {
        self.random_range(0..n)
    }
}

/// Linear indices of cells known to be empty.
///
/// Drawing removes the chosen index by swapping the last entry into its slot,
/// so the order of the list changes as it is consumed.
#[derive(Debug, Default)]
pub struct VacancyList {
    idxs: Vec<usize>,
}

impl VacancyList {
    /// List every cell of a grid with `n_cells` cells.
    pub fn all(n_cells: usize) -> Self {
        Self {
            idxs: (0..n_cells).collect(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            idxs: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, idx: usize) {
        self.idxs.push(idx);
    }

    pub fn len(&self) -> usize {
        self.idxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idxs.is_empty()
    }

    /// Remove and return a uniformly chosen vacancy.
    pub fn take<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let pick = rng.draw_index(self.idxs.len());
        Some(self.idxs.swap_remove(pick))
    }

    /// Place `count` agents of type `agent` at distinct random vacancies.
    ///
    /// Fails without touching the grid if fewer than `count` vacancies remain.
    pub fn populate<R: RandomSource + ?Sized>(
        &mut self,
        grid: &mut Grid,
        agent: AgentType,
        count: usize,
        rng: &mut R,
    ) -> Result<(), WorldError> {
        if count > self.len() {
            return Err(WorldError::InvariantBroken {
                agent,
                requested: count,
                available: self.len(),
            });
        }
        for _ in 0..count {
            let idx = self.take(rng).ok_or(WorldError::InvariantBroken {
                agent,
                requested: count,
                available: 0,
            })?;
            grid.set_cell(idx, agent);
        }
        Ok(())
    }
}

/// Replays a fixed sequence of draws.
#[cfg(test)]
pub struct Scripted(pub std::collections::VecDeque<usize>);

#[cfg(test)]
impl Scripted {
    pub fn new(draws: &[usize]) -> Self {
        Self(draws.iter().copied().collect())
    }
}

#[cfg(test)]
impl RandomSource for Scripted {
    fn draw_index(&mut self, n: usize) -> usize {
        let draw = self.0.pop_front().expect("script ran out of draws");
        assert!(draw < n, "scripted draw {draw} outside 0..{n}");
        draw
    }
}
