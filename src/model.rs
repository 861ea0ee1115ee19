//! Grid data types.

use crate::error::WorldError;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Index};

/// Content of a single grid cell.
///
/// `Empty` marks an unoccupied cell, not an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    TypeA,
    TypeB,
    Empty,
}

impl AgentType {
    /// Agent types that can be displaced, in repopulation order.
    pub const OCCUPANTS: [AgentType; 2] = [AgentType::TypeA, AgentType::TypeB];

    /// Every cell state, in initial placement order.
    pub const ALL: [AgentType; 3] = [AgentType::TypeA, AgentType::TypeB, AgentType::Empty];

    pub fn is_empty(self) -> bool {
        self == AgentType::Empty
    }

    fn symbol(self) -> char {
        match self {
            AgentType::TypeA => 'A',
            AgentType::TypeB => 'B',
            AgentType::Empty => '.',
        }
    }
}

/// Outcome of evaluating one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Satisfaction {
    Satisfied,
    Unsatisfied,
    /// Only for empty cells.
    NotApplicable,
}

/// Requested share of the grid for each cell state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub type_a: f64,
    pub type_b: f64,
    pub empty: f64,
}

impl Distribution {
    pub fn fraction(&self, agent: AgentType) -> f64 {
        match agent {
            AgentType::TypeA => self.type_a,
            AgentType::TypeB => self.type_b,
            AgentType::Empty => self.empty,
        }
    }
}

/// Square lattice of cells stored in row-major order.
///
/// The linear index of `(row, col)` is `row * side_len + col`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    side_len: usize,
    cells: Vec<AgentType>,
}

impl Grid {
    /// Create a grid whose cells are all empty.
    pub fn new(side_len: usize) -> Result<Self, WorldError> {
        let n_cells = side_len
            .checked_mul(side_len)
            .filter(|&n_cells| n_cells > 0)
            .ok_or(WorldError::InvalidDimension(side_len))?;
        Ok(Self {
            side_len,
            cells: vec![AgentType::Empty; n_cells],
        })
    }

    /// Build a grid from explicit rows, which must form a non-empty square.
    #[cfg(test)]
    pub fn from_rows<R: AsRef<[AgentType]>>(rows: &[R]) -> Result<Self, WorldError> {
        let side_len = rows.len();
        let mut grid = Self::new(side_len)?;
        for (row, cells) in rows.iter().enumerate() {
            let cells = cells.as_ref();
            if cells.len() != side_len {
                return Err(WorldError::InvalidDimension(cells.len()));
            }
            let start = row * side_len;
            grid.cells[start..start + side_len].copy_from_slice(cells);
        }
        Ok(grid)
    }

    pub fn side_len(&self) -> usize {
        self.side_len
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Get the cell at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: usize, col: usize) -> Option<AgentType> {
        if row < self.side_len && col < self.side_len {
            Some(self.cells[row * self.side_len + col])
        } else {
            None
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[AgentType] {
        &self.cells
    }

    /// Iterate over the rows of the grid.
    pub fn rows(&self) -> impl Iterator<Item = &[AgentType]> + '_ {
        self.cells.chunks_exact(self.side_len)
    }

    /// Number of cells holding `agent`.
    pub fn count(&self, agent: AgentType) -> usize {
        self.cells.iter().filter(|&&cell| cell == agent).count()
    }

    /// Convert a linear index into `(row, col)`.
    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx / self.side_len, idx % self.side_len)
    }

    /// Check that the cell buffer matches the side length.
    ///
    /// Only grids decoded from external data can fail this.
    pub fn check_shape(&self) -> Result<(), WorldError> {
        match self.side_len.checked_mul(self.side_len) {
            Some(n_cells) if n_cells > 0 && n_cells == self.cells.len() => Ok(()),
            _ => Err(WorldError::InvalidDimension(self.side_len)),
        }
    }

    pub(crate) fn set_cell(&mut self, idx: usize, agent: AgentType) {
        self.cells[idx] = agent;
    }
}

impl Index<(usize, usize)> for Grid {
    type Output = AgentType;

    fn index(&self, (row, col): (usize, usize)) -> &AgentType {
        assert!(
            row < self.side_len && col < self.side_len,
            "position ({row}, {col}) outside {0}x{0} grid",
            self.side_len
        );
        &self.cells[row * self.side_len + col]
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cells) in self.rows().enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in cells {
                write!(f, "{}", cell.symbol())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AgentType::{Empty as E, TypeA as A, TypeB as B};

    use super::*;

    #[test]
    fn new_grid_is_empty() {
        let grid = Grid::new(4).unwrap();
        assert_eq!(grid.n_cells(), 16);
        assert_eq!(grid.count(E), 16);
    }

    #[test]
    fn zero_side_is_rejected() {
        assert_eq!(Grid::new(0), Err(WorldError::InvalidDimension(0)));
        assert_eq!(
            Grid::new(usize::MAX),
            Err(WorldError::InvalidDimension(usize::MAX))
        );
    }

    #[test]
    fn from_rows_requires_square() {
        let err = Grid::from_rows(&[vec![A, B], vec![E]]).unwrap_err();
        assert_eq!(err, WorldError::InvalidDimension(1));
    }

    #[test]
    fn indexing_is_row_major() {
        let grid = Grid::from_rows(&[[A, B], [E, A]]).unwrap();
        assert_eq!(grid[(0, 1)], B);
        assert_eq!(grid[(1, 0)], E);
        assert_eq!(grid.cells(), &[A, B, E, A]);
        assert_eq!(grid.position(3), (1, 1));
        assert_eq!(grid.get(2, 0), None);
    }

    #[test]
    fn display_uses_one_char_per_cell() {
        let grid = Grid::from_rows(&[[A, B], [E, A]]).unwrap();
        assert_eq!(grid.to_string(), "AB\n.A");
    }

    #[test]
    fn check_shape_catches_truncated_buffer() {
        let mut grid = Grid::new(3).unwrap();
        assert!(grid.check_shape().is_ok());
        grid.cells.pop();
        assert_eq!(grid.check_shape(), Err(WorldError::InvalidDimension(3)));
    }
}
