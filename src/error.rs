use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("only tensors of rank 2 or 3 can be sampled, got rank {0}")]
    UnsupportedRank(usize),

    #[error("Tensor Shape Error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("tensor `{name}` has {actual} values, expected {expected}")]
    TensorSize {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid model dimensions: {0}")]
    InvalidDimensions(String),
}
