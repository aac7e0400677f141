use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;

use crate::Show;

/// Errors that can occur when accessing a [`Grid`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum GridError {
    /// A read or removal addressed a cell outside of the current extents.
    #[error("index {row}x{column} out of bounds, grid size is {rows}x{columns}")]
    OutOfRange {
        /// The requested row.
        row: usize,
        /// The requested column.
        column: usize,
        /// Number of rows at the time of the access.
        rows: usize,
        /// Number of columns at the time of the access.
        columns: usize,
    },
    /// The operation needs a square grid.
    #[error("operation needs a square grid, but grid size is {rows}x{columns}")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        columns: usize,
    },
}

/// A rectangular two-dimensional container addressed by `(row, column)`, where every cell
/// either holds a value of type `T` or is absent.
///
/// Values are stored column by column. Writing outside of the current extents grows the
/// grid until the written cell is included, new cells start out absent. A grid never
/// shrinks, so every column always has exactly [`Self::row_count`] entries.
///
/// Cloning a grid creates new storage and clones every present value. For values that are
/// themselves handles (like `Arc`), the referenced data is shared between both grids.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Grid<T> {
    columns: Vec<Vec<Option<T>>>,
    rows: usize,
}

impl<T> Default for Grid<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: 0,
        }
    }
}

impl<T> Grid<T> {
    /// Creates an empty grid with zero rows and zero columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a grid of the given size where every cell is absent.
    pub fn with_size(rows: usize, columns: usize) -> Self {
        let mut grid = Self::new();
        grid.grow_columns(columns);
        grid.grow_rows(rows);
        grid
    }

    /// Creates a square grid with `size` rows and columns, all cells absent.
    pub fn square(size: usize) -> Self {
        Self::with_size(size, size)
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the grid has as many rows as it has columns.
    pub fn is_square(&self) -> bool {
        self.rows == self.columns.len()
    }

    /// Returns the number of rows if the grid is square and a [`GridError::NotSquare`] otherwise.
    pub fn square_size(&self) -> Result<usize, GridError> {
        if self.is_square() {
            Ok(self.rows)
        } else {
            Err(GridError::NotSquare {
                rows: self.rows,
                columns: self.columns.len(),
            })
        }
    }

    fn check(&self, row: usize, column: usize) -> Result<(), GridError> {
        if row >= self.rows || column >= self.columns.len() {
            Err(GridError::OutOfRange {
                row,
                column,
                rows: self.rows,
                columns: self.columns.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Reads the cell at `(row, column)`. Gives `Ok(None)` for an absent cell and fails
    /// with [`GridError::OutOfRange`] if either index exceeds the current extents.
    pub fn get(&self, row: usize, column: usize) -> Result<Option<&T>, GridError> {
        self.check(row, column)?;
        Ok(self.columns[column][row].as_ref())
    }

    /// Mutable variant of [`Self::get`].
    pub fn get_mut(&mut self, row: usize, column: usize) -> Result<Option<&mut T>, GridError> {
        self.check(row, column)?;
        Ok(self.columns[column][row].as_mut())
    }

    /// Writes `value` into the cell at `(row, column)`, growing the grid first if the cell
    /// lies outside of the current extents. Returns `self` to allow chaining.
    pub fn set(&mut self, value: T, row: usize, column: usize) -> &mut Self {
        if row >= self.rows {
            self.grow_rows(row + 1 - self.rows);
        }
        if column >= self.columns.len() {
            self.grow_columns(column + 1 - self.columns.len());
        }
        self.columns[column][row] = Some(value);
        self
    }

    /// Removes the value at `(row, column)`, leaving the cell absent, and returns it.
    pub fn take(&mut self, row: usize, column: usize) -> Result<Option<T>, GridError> {
        self.check(row, column)?;
        Ok(self.columns[column][row].take())
    }

    /// Appends `n` columns, each holding an absent entry for every existing row.
    pub fn grow_columns(&mut self, n: usize) {
        let rows = self.rows;
        self.columns.extend(
            (0..n).map(|_| std::iter::repeat_with(|| None).take(rows).collect::<Vec<_>>()),
        );
    }

    /// Appends `n` absent entries to every existing column.
    pub fn grow_rows(&mut self, n: usize) {
        self.rows += n;
        for column in &mut self.columns {
            column.extend(std::iter::repeat_with(|| None).take(n));
        }
    }

    /// Grows the grid by `n` rows and `n` columns.
    pub fn grow(&mut self, n: usize) {
        self.grow_columns(n);
        self.grow_rows(n);
    }

    /// Reconstructs the row with index `row` by visiting every column.
    pub fn row(&self, row: usize) -> Result<Vec<Option<&T>>, GridError> {
        if row >= self.rows {
            return Err(GridError::OutOfRange {
                row,
                column: 0,
                rows: self.rows,
                columns: self.columns.len(),
            });
        }
        Ok(self.columns.iter().map(|c| c[row].as_ref()).collect())
    }

    /// Gives a view of the column with index `column`.
    pub fn column(&self, column: usize) -> Result<&[Option<T>], GridError> {
        self.columns
            .get(column)
            .map(|c| c.as_slice())
            .ok_or(GridError::OutOfRange {
                row: 0,
                column,
                rows: self.rows,
                columns: self.columns.len(),
            })
    }

    /// Iterates over all cells in column-major order, that is column after column.
    pub fn flatten(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.columns.iter().flat_map(|c| c.iter().map(|v| v.as_ref()))
    }

    /// Iterates over all present cells in column-major order, together with their
    /// `(row, column)` position.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        self.columns.iter().enumerate().flat_map(|(column, c)| {
            c.iter()
                .enumerate()
                .filter_map(move |(row, v)| v.as_ref().map(|v| (row, column, v)))
        })
    }

    /// Mutable access to every present value, in column-major order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.columns.iter_mut().flat_map(|c| c.iter_mut().flatten())
    }

    /// Makes every cell whose value does not satisfy `pred` absent.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut pred: F) {
        for cell in self.columns.iter_mut().flat_map(|c| c.iter_mut()) {
            if cell.as_ref().is_some_and(|v| !pred(v)) {
                *cell = None;
            }
        }
    }

    /// Works like [`Self::retain`] but operates on a copy, leaving `self` untouched.
    pub fn filtered<F: FnMut(&T) -> bool>(&self, pred: F) -> Self
    where
        T: Clone,
    {
        let mut out = self.clone();
        out.retain(pred);
        out
    }

    /// Sets every cell to a clone of `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        for cell in self.columns.iter_mut().flat_map(|c| c.iter_mut()) {
            *cell = Some(value.clone());
        }
    }
}

impl<T: Show> Show for Grid<T> {
    fn show(&self) -> String {
        let mut builder = tabled::builder::Builder::default();
        for row in 0..self.rows {
            builder.push_record(
                self.columns
                    .iter()
                    .map(|c| c[row].as_ref().map_or("-".to_string(), |v| v.show())),
            );
        }
        builder
            .build()
            .with(tabled::settings::Style::ascii())
            .to_string()
    }
}

impl<T: Show> Display for Grid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.rows == 0 || self.columns.is_empty() {
            return write!(f, "[]");
        }
        write!(f, "{}", self.show())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Grid {}x{}", self.rows, self.columns.len())?;
        for row in 0..self.rows {
            writeln!(
                f,
                "{}",
                self.columns
                    .iter()
                    .map(|c| c[row].as_ref().map_or("-".to_string(), |v| format!("{v:?}")))
                    .join(" ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_reads_fail() {
        let grid: Grid<u32> = Grid::new();
        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.column_count(), 0);
        assert_eq!(
            grid.get(0, 0),
            Err(GridError::OutOfRange {
                row: 0,
                column: 0,
                rows: 0,
                columns: 0
            })
        );
    }

    #[test]
    fn set_grows_and_get_reads_back() {
        let mut grid = Grid::new();
        grid.set('a', 0, 0).set('b', 2, 3);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.column_count(), 4);
        assert_eq!(grid.get(0, 0), Ok(Some(&'a')));
        assert_eq!(grid.get(2, 3), Ok(Some(&'b')));
        assert_eq!(grid.get(1, 1), Ok(None));
        assert!(matches!(grid.get(3, 0), Err(GridError::OutOfRange { .. })));
        assert!(matches!(grid.get(0, 4), Err(GridError::OutOfRange { .. })));

        grid.set('c', 5, 1);
        assert_eq!(grid.get(0, 0), Ok(Some(&'a')));
        assert_eq!(grid.get(2, 3), Ok(Some(&'b')));
        assert_eq!(grid.get(5, 1), Ok(Some(&'c')));
        assert_eq!(grid.row_count(), 6);
        assert_eq!(grid.column_count(), 4);
        for c in 0..grid.column_count() {
            assert_eq!(grid.column(c).unwrap().len(), grid.row_count());
        }
        for r in 0..grid.row_count() {
            assert_eq!(grid.row(r).unwrap().len(), grid.column_count());
        }
    }

    #[test]
    fn grow_keeps_rectangular() {
        let mut grid: Grid<u8> = Grid::new();
        grid.grow_columns(2);
        assert_eq!((grid.row_count(), grid.column_count()), (0, 2));
        grid.grow_rows(3);
        assert_eq!((grid.row_count(), grid.column_count()), (3, 2));
        grid.grow(1);
        assert_eq!((grid.row_count(), grid.column_count()), (4, 3));
        assert!(!grid.is_square());
        assert_eq!(
            grid.square_size(),
            Err(GridError::NotSquare {
                rows: 4,
                columns: 3
            })
        );
        assert!(grid.flatten().all(|v| v.is_none()));
        assert_eq!(grid.flatten().count(), 12);
        assert_eq!(Grid::<u8>::square(3).square_size(), Ok(3));
    }

    #[test]
    fn rows_columns_and_flatten() {
        let mut grid = Grid::new();
        grid.set(1, 0, 0).set(2, 1, 0).set(3, 0, 1).set(4, 1, 1);
        assert_eq!(grid.row(0).unwrap(), vec![Some(&1), Some(&3)]);
        assert_eq!(grid.column(1).unwrap(), &[Some(3), Some(4)]);
        assert_eq!(
            grid.flatten().collect::<Vec<_>>(),
            vec![Some(&1), Some(&2), Some(&3), Some(&4)]
        );
        assert_eq!(
            grid.cells().collect::<Vec<_>>(),
            vec![(0, 0, &1), (1, 0, &2), (0, 1, &3), (1, 1, &4)]
        );
        assert!(grid.row(2).is_err());
        assert!(grid.column(2).is_err());
    }

    #[test]
    fn copy_and_filter() {
        let mut grid = Grid::new();
        grid.set(1, 0, 0).set(2, 0, 1).set(3, 1, 1);

        let odd = grid.filtered(|v| v % 2 == 1);
        assert_eq!(odd.get(0, 1), Ok(None));
        assert_eq!(odd.get(1, 1), Ok(Some(&3)));
        assert_eq!(grid.get(0, 1), Ok(Some(&2)));

        grid.retain(|v| *v > 1);
        assert_eq!(grid.get(0, 0), Ok(None));
        assert_eq!(grid.get(0, 1), Ok(Some(&2)));
        assert_eq!((grid.row_count(), grid.column_count()), (2, 2));

        grid.fill(7);
        assert!(grid.flatten().all(|v| v == Some(&7)));
        assert_eq!(grid.take(1, 0), Ok(Some(7)));
        assert_eq!(grid.get(1, 0), Ok(None));
    }

    #[test]
    fn clone_shares_handles() {
        use std::rc::Rc;
        let mut grid = Grid::new();
        let value = Rc::new(String::from("shared"));
        grid.set(vec![Rc::clone(&value)], 0, 0);
        let copy = grid.clone();
        grid.set(vec![], 0, 0);

        let cell = copy.get(0, 0).unwrap().unwrap();
        assert!(Rc::ptr_eq(&cell[0], &value));
        assert_eq!(grid.get(0, 0), Ok(Some(&vec![])));
    }

    #[test]
    fn display_marks_absent_cells() {
        let mut grid = Grid::new();
        grid.set(5usize, 0, 1);
        let shown = grid.to_string();
        assert!(shown.contains('-'));
        assert!(shown.contains('5'));
        assert_eq!(Grid::<usize>::new().to_string(), "[]");
    }
}
