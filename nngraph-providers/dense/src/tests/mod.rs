pub(crate) use super::{DenseMatrixProvider, DenseMatrixProviderError};

mod delimited;
mod support;
