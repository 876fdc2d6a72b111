//! Matrix: column-major grid of optional cells that only ever shrinks.

use crate::error::BoardError;
use std::fmt;

/// Up, down, left, right. No diagonals.
const NEIGHBOURS_4: [(isize, isize); 4] = [(0, 1), (0, -1), (-1, 0), (1, 0)];

/// A cell address. `x` is the column (0 = leftmost), `y` the row (0 = bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// The 4-neighbourhood of this position, restricted to a `cols` x `rows` grid.
    pub fn neighbors(self, cols: usize, rows: usize) -> impl Iterator<Item = Self> {
        NEIGHBOURS_4.into_iter().filter_map(move |(dx, dy)| {
            let x = self.x.checked_add_signed(dx)?;
            let y = self.y.checked_add_signed(dy)?;
            (x < cols && y < rows).then_some(Self { x, y })
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Grid of `Option<T>` stored as columns: `columns[x][y]`, y = 0 at the bottom.
///
/// Every column always has the same length. Width and height never grow past
/// the values given to [`Matrix::new`]; [`Matrix::compact_down_and_left`] is
/// the only operation that changes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix<T> {
    columns: Vec<Vec<Option<T>>>,
}

impl<T> Matrix<T> {
    /// Build a full `num_cols` x `num_rows` matrix, calling `init(x, y)` once per cell
    /// in column-major order.
    pub fn new(
        num_cols: usize,
        num_rows: usize,
        mut init: impl FnMut(usize, usize) -> T,
    ) -> Result<Self, BoardError> {
        if num_cols == 0 || num_rows == 0 {
            return Err(BoardError::InvalidDimension {
                cols: num_cols,
                rows: num_rows,
            });
        }
        let mut columns = Vec::with_capacity(num_cols);
        for x in 0..num_cols {
            let mut column = Vec::with_capacity(num_rows);
            for y in 0..num_rows {
                column.push(Some(init(x, y)));
            }
            columns.push(column);
        }
        Ok(Self { columns })
    }

    #[inline]
    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    /// Common column height; 0 once every column has been excised.
    #[inline]
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.num_cols() && y < self.num_rows()
    }

    fn check(&self, x: usize, y: usize) -> Result<(), BoardError> {
        if self.contains(x, y) {
            Ok(())
        } else {
            Err(BoardError::IndexOutOfBounds {
                x,
                y,
                cols: self.num_cols(),
                rows: self.num_rows(),
            })
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Result<Option<&T>, BoardError> {
        self.check(x, y)?;
        Ok(self.columns[x][y].as_ref())
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Result<Option<&mut T>, BoardError> {
        self.check(x, y)?;
        Ok(self.columns[x][y].as_mut())
    }

    /// Store `value` at `(x, y)`, returning the previous occupant.
    pub fn set(&mut self, x: usize, y: usize, value: Option<T>) -> Result<Option<T>, BoardError> {
        self.check(x, y)?;
        Ok(std::mem::replace(&mut self.columns[x][y], value))
    }

    pub fn take(&mut self, x: usize, y: usize) -> Result<Option<T>, BoardError> {
        self.set(x, y, None)
    }

    /// Occupant at `pos`; `None` for empty or out-of-range cells.
    #[inline]
    pub fn cell(&self, pos: Position) -> Option<&T> {
        self.columns.get(pos.x)?.get(pos.y)?.as_ref()
    }

    #[inline]
    pub fn cell_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.columns.get_mut(pos.x)?.get_mut(pos.y)?.as_mut()
    }

    /// Empty the cell at `pos`, returning its occupant.
    #[inline]
    pub fn remove(&mut self, pos: Position) -> Option<T> {
        self.columns.get_mut(pos.x)?.get_mut(pos.y)?.take()
    }

    pub fn column(&self, x: usize) -> Option<&[Option<T>]> {
        self.columns.get(x).map(Vec::as_slice)
    }

    /// Occupied cells, column-major (x ascending, then y ascending).
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        self.columns.iter().enumerate().flat_map(|(x, column)| {
            column
                .iter()
                .enumerate()
                .filter_map(move |(y, cell)| cell.as_ref().map(|t| (Position { x, y }, t)))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Position, &mut T)> {
        self.columns.iter_mut().enumerate().flat_map(|(x, column)| {
            column
                .iter_mut()
                .enumerate()
                .filter_map(move |(y, cell)| cell.as_mut().map(|t| (Position { x, y }, t)))
        })
    }

    /// Visit every occupied cell in column-major order.
    pub fn for_each_cell(&self, mut visit: impl FnMut(&T)) {
        for (_, cell) in self.iter() {
            visit(cell);
        }
    }

    /// True if `predicate` holds for every cell, empty ones included.
    pub fn all_satisfy(&self, mut predicate: impl FnMut(Option<&T>) -> bool) -> bool {
        for column in &self.columns {
            for cell in column {
                if !predicate(cell.as_ref()) {
                    return false;
                }
            }
        }
        true
    }

    pub fn occupied_count(&self) -> usize {
        self.iter().count()
    }

    /// Gravity: drop occupied cells to the bottom of their column (keeping their
    /// order), pad every column to the tallest remaining height, then excise
    /// columns that hold nothing, shifting the rest left.
    pub fn compact_down_and_left(&mut self) {
        for column in &mut self.columns {
            column.retain(Option::is_some);
        }
        let height = self.columns.iter().map(Vec::len).max().unwrap_or(0);
        for column in &mut self.columns {
            column.resize_with(height, || None);
        }
        // A single filter is enough: dropping one empty column never empties another.
        self.columns.retain(|column| column.iter().any(Option::is_some));
    }
}
