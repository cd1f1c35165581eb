//! Rectangular `(item, period)` storage.

use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::error::{ClspError, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Grid { rows, cols, data: vec![value; rows * cols] }
    }
}

impl<T> Grid<T> {
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Grid { rows, cols, data }
    }

    /// Builds a grid from nested rows, failing when they are ragged or the
    /// dimensions do not match.
    pub fn from_rows(name: &str, rows: usize, cols: usize, nested: Vec<Vec<T>>) -> Result<Self> {
        if nested.len() != rows {
            return Err(ClspError::Data(format!("{name}: expected {rows} rows, found {}", nested.len())));
        }
        let mut data = Vec::with_capacity(rows * cols);
        for (r, row) in nested.into_iter().enumerate() {
            if row.len() != cols {
                return Err(ClspError::Data(format!(
                    "{name}: row {r} has {} entries, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Grid { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, r: usize) -> &[T] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let cols = self.cols;
        self.data.iter().enumerate().map(move |(i, v)| ((i / cols, i % cols), v))
    }

    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (r, c): (usize, usize)) -> &T {
        assert!(r < self.rows && c < self.cols, "grid index ({r}, {c}) out of {}x{}", self.rows, self.cols);
        &self.data[r * self.cols + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        assert!(r < self.rows && c < self.cols, "grid index ({r}, {c}) out of {}x{}", self.rows, self.cols);
        &mut self.data[r * self.cols + c]
    }
}
