use rand::Rng;
use serde::{Serialize, Deserialize};

/// Dense row-major matrix.
///
/// Layer weights are stored as `(input_size, size)`: row `i` holds the
/// weights leaving input `i`, column `j` the weights entering node `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![value; cols]; rows]
        }
    }

    /// Uniform samples in [-1, 1) drawn from the caller's generator, so that a
    /// seeded generator reproduces the same network.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);

        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = rng.gen::<f64>() * 2.0 - 1.0;
            }
        }

        res
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let cols = data.first().map_or(0, |row| row.len());
        assert!(data.iter().all(|row| row.len() == cols), "ragged matrix rows");
        Matrix {
            rows: data.len(),
            cols,
            data
        }
    }

    /// Row-vector product `v · M`. `v.len()` must equal `rows`.
    pub fn left_mul(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.rows, "Matrices are of incorrect sizes");
        let mut res = vec![0.0; self.cols];
        for (x, row) in v.iter().zip(self.data.iter()) {
            for (acc, w) in res.iter_mut().zip(row.iter()) {
                *acc += x * w;
            }
        }
        res
    }

    /// Row-vector product with the transpose, `v · Mᵀ`. `v.len()` must equal `cols`.
    pub fn left_mul_transposed(&self, v: &[f64]) -> Vec<f64> {
        assert_eq!(v.len(), self.cols, "Matrices are of incorrect sizes");
        self.data.iter()
            .map(|row| row.iter().zip(v.iter()).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// Accumulates the outer product `aᵀ · b` into `self`.
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), self.rows, "Matrices are of incorrect sizes");
        assert_eq!(b.len(), self.cols, "Matrices are of incorrect sizes");
        for (row, &x) in self.data.iter_mut().zip(a.iter()) {
            for (acc, &y) in row.iter_mut().zip(b.iter()) {
                *acc += x * y;
            }
        }
    }

    pub fn same_shape(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().flatten().all(|x| x.is_finite())
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.data.iter().flatten()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn left_mul_matches_hand_computation() {
        let m = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert_eq!(m.left_mul(&[1.0, 0.0, -1.0]), vec![-4.0, -4.0]);
        assert_eq!(m.left_mul_transposed(&[1.0, 1.0]), vec![3.0, 7.0, 11.0]);
    }

    #[test]
    fn add_outer_accumulates() {
        let mut m = Matrix::zeros(2, 2);
        m.add_outer(&[1.0, 2.0], &[3.0, 4.0]);
        m.add_outer(&[1.0, 0.0], &[1.0, 1.0]);
        assert_eq!(m.data, vec![vec![4.0, 5.0], vec![6.0, 8.0]]);
    }

    #[test]
    fn seeded_random_is_reproducible_and_bounded() {
        let a = Matrix::random(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::random(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| (-1.0..1.0).contains(&x)));
    }

    #[test]
    fn is_finite_detects_nan() {
        let mut m = Matrix::zeros(2, 2);
        assert!(m.is_finite());
        m.data[1][0] = f64::NAN;
        assert!(!m.is_finite());
    }
}
