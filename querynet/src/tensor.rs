use bincode::{Decode, Encode};

use crate::errors::{QuerynetError, Result};

/// Formats a value as the shortest string that reads back to the same `f32`.
///
/// The result always carries a decimal point or an exponent, e.g. `1.0`, `0.25`, `1e-7`.
pub fn format_value(value: f32) -> String {
    format!("{value:?}")
}

/// Dense row-major array of `f32`.
#[derive(Clone, Debug, PartialEq, Decode, Encode)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor.
    ///
    /// # Arguments
    ///
    /// * `shape` - Size of each dimension.
    /// * `data` - Values in row-major order.
    ///
    /// # Errors
    ///
    /// If the length of `data` is not the product of `shape`, an error variant will be returned.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        check_size(&shape, data.len())
            .map_err(|msg| QuerynetError::invalid_argument("data", msg))?;
        Ok(Self { shape, data })
    }

    /// Checks that the number of values matches the shape.
    ///
    /// Tensors built by [`Tensor::new`] always pass. Decoded tensors may not.
    ///
    /// # Errors
    ///
    /// If the length of the data is not the product of the shape, an error variant will be
    /// returned.
    pub fn validate(&self) -> Result<()> {
        check_size(&self.shape, self.data.len())
            .map_err(|msg| QuerynetError::invalid_model(format!("tensor of {msg}")))
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; size],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of values stored per row: the last dimension, or 1 for a scalar.
    fn n_cols(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }

    /// Gets the row at the given index, where a row spans the last dimension and all leading
    /// dimensions are flattened.
    pub fn row(&self, idx: usize) -> &[f32] {
        let cols = self.n_cols();
        &self.data[idx * cols..(idx + 1) * cols]
    }

    /// Mutable variant of [`Tensor::row`].
    pub fn row_mut(&mut self, idx: usize) -> &mut [f32] {
        let cols = self.n_cols();
        &mut self.data[idx * cols..(idx + 1) * cols]
    }

    /// Number of rows when all leading dimensions are flattened.
    pub fn n_rows(&self) -> usize {
        match self.shape.split_last() {
            Some((_, leading)) => leading.iter().product(),
            None => 1,
        }
    }

    /// Stringifies the values.
    ///
    /// A row is written as space-separated values, and rows are separated by newlines. Tensors
    /// of rank 3 or more are written as rows of their last dimension. A vector becomes a single
    /// line, and a scalar becomes a single value.
    pub fn to_text(&self) -> String {
        if self.rank() < 2 {
            return join_values(&self.data);
        }
        (0..self.n_rows())
            .map(|i| join_values(self.row(i)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parses values written by [`Tensor::to_text`].
    ///
    /// # Arguments
    ///
    /// * `text` - Stringified values.
    /// * `shape` - Expected shape of the tensor.
    ///
    /// # Errors
    ///
    /// If `text` contains a token that is not a number, or the number of values (or rows for
    /// tensors of rank 2 or more) does not match `shape`, an error variant will be returned.
    pub fn from_text(text: &str, shape: Vec<usize>) -> Result<Self> {
        if shape.len() >= 2 {
            let cols = shape[shape.len() - 1];
            let Some(rows) = shape[..shape.len() - 1]
                .iter()
                .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            else {
                return Err(QuerynetError::invalid_argument(
                    "text",
                    format!("shape {shape:?} is too large"),
                ));
            };
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            if cols != 0 && lines.len() != rows {
                return Err(QuerynetError::invalid_argument(
                    "text",
                    format!("expected {} rows, but found {}", rows, lines.len()),
                ));
            }
            let mut data = vec![];
            for line in lines {
                let row = parse_values(line)?;
                if row.len() != cols {
                    return Err(QuerynetError::invalid_argument(
                        "text",
                        format!("expected {} columns, but found {}", cols, row.len()),
                    ));
                }
                data.extend(row);
            }
            Self::new(shape, data)
        } else {
            Self::new(shape, parse_values(text)?)
        }
    }
}

fn check_size(shape: &[usize], len: usize) -> Result<(), String> {
    let Some(size) = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)) else {
        return Err(format!("shape {shape:?} is too large"));
    };
    if size != len {
        return Err(format!(
            "shape {shape:?} requires {size} values, but {len} were given"
        ));
    }
    Ok(())
}

fn join_values(values: &[f32]) -> String {
    values
        .iter()
        .map(|&v| format_value(v))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_values(text: &str) -> Result<Vec<f32>> {
    text.split_whitespace()
        .map(|token| Ok(token.parse::<f32>()?))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use bincode::config;

    #[test]
    fn test_format_value() {
        assert_eq!("1.0", format_value(1.0));
        assert_eq!("0.0", format_value(0.0));
        assert_eq!("-0.25", format_value(-0.25));
        assert_eq!("0.1", format_value(0.1));
    }

    #[test]
    fn test_tensor_new_size_mismatch() {
        let t = Tensor::new(vec![2, 3], vec![1.0; 5]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: data: shape [2, 3] requires 6 values, but 5 were given",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_tensor_new_overflow() {
        let t = Tensor::new(vec![1 << 40, 1 << 40], vec![]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: data: shape [1099511627776, 1099511627776] is too large",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_validate_decoded() {
        let bytes =
            bincode::encode_to_vec((vec![2usize, 3], vec![1.0f32]), config::standard()).unwrap();
        let (t, _): (Tensor, usize) = bincode::decode_from_slice(&bytes, config::standard()).unwrap();

        assert_eq!(&[2, 3], t.shape());
        assert_eq!(
            "InvalidModelError: tensor of shape [2, 3] requires 6 values, but 1 were given",
            &t.validate().err().unwrap().to_string()
        );
    }

    #[test]
    fn test_tensor_rows() {
        let t = Tensor::new(vec![2, 2, 3], (0..12).map(|i| i as f32).collect()).unwrap();

        assert_eq!(4, t.n_rows());
        assert_eq!(&[3.0, 4.0, 5.0], t.row(1));
        assert_eq!(&[9.0, 10.0, 11.0], t.row(3));
    }

    #[test]
    fn test_to_text_matrix() {
        let t = Tensor::new(vec![2, 3], vec![1.0, 0.5, -2.0, 0.0, 3.25, 4.0]).unwrap();

        assert_eq!("1.0 0.5 -2.0\n0.0 3.25 4.0", t.to_text());
    }

    #[test]
    fn test_to_text_matrix_preserves_order() {
        let data: Vec<f32> = (0..12).map(|i| i as f32 * 0.5 - 1.0).collect();
        let t = Tensor::new(vec![4, 3], data.clone()).unwrap();

        let restored: Vec<String> = t
            .to_text()
            .lines()
            .flat_map(|l| l.split(' ').map(str::to_string).collect::<Vec<_>>())
            .collect();
        let expected: Vec<String> = data.iter().map(|&v| format_value(v)).collect();
        assert_eq!(expected, restored);
        assert_eq!(4, t.to_text().lines().count());
    }

    #[test]
    fn test_to_text_vector() {
        let t = Tensor::new(vec![3], vec![0.1, 0.2, 0.3]).unwrap();

        assert_eq!("0.1 0.2 0.3", t.to_text());
    }

    #[test]
    fn test_to_text_scalar() {
        let t = Tensor::new(vec![], vec![7.5]).unwrap();

        assert_eq!("7.5", t.to_text());
    }

    #[test]
    fn test_to_text_rank3() {
        let t = Tensor::new(vec![2, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!("1.0 2.0\n3.0 4.0", t.to_text());
    }

    #[test]
    fn test_from_text_matrix() {
        let t = Tensor::from_text("1.0 2.0\n3.0 4.0\n", vec![2, 2]).unwrap();

        assert_eq!(&[1.0, 2.0, 3.0, 4.0], t.data());
        assert_eq!(&[2, 2], t.shape());
    }

    #[test]
    fn test_from_text_wrong_columns() {
        let t = Tensor::from_text("1.0 2.0\n3.0", vec![2, 2]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: text: expected 2 columns, but found 1",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_text_wrong_rows() {
        let t = Tensor::from_text("1.0 2.0", vec![2, 2]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: text: expected 2 rows, but found 1",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_text_huge_dimension() {
        let t = Tensor::from_text("1.0", vec![1, 1 << 60]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: text: expected 1152921504606846976 columns, but found 1",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_text_overflowing_shape() {
        let t = Tensor::from_text("1.0", vec![1 << 40, 1 << 40, 1]);

        assert!(t.is_err());
        assert_eq!(
            "InvalidArgumentError: text: shape [1099511627776, 1099511627776, 1] is too large",
            &t.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_from_text_not_a_number() {
        let t = Tensor::from_text("1.0 abc", vec![2]);

        assert!(t.is_err());
    }
}
