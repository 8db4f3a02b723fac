//! Delimited text ingestion.
//!
//! One row per line. Blank lines and lines starting with `#` are skipped. A
//! whitespace delimiter splits on any run of whitespace; other delimiters
//! split exactly and trim each field.
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use nngraph_core::NnGraphError;
use tracing::{debug, instrument};

use crate::{errors::DenseMatrixProviderError, provider::DenseMatrixProvider};

impl DenseMatrixProvider {
    /// Loads a delimited text file.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::Io`] when the file cannot be read,
    /// and the errors of [`Self::try_from_delimited_reader`].
    #[instrument(name = "providers.dense.delimited", err, skip(name, path), fields(path = %path.as_ref().display()))]
    pub fn try_from_delimited_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        delimiter: char,
    ) -> Result<Self, DenseMatrixProviderError> {
        let file = File::open(path)?;
        Self::try_from_delimited_reader(name, BufReader::new(file), delimiter)
    }

    /// Loads delimited text from any buffered reader.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::InvalidNumber`] for fields that do
    /// not parse as `f64`, [`DenseMatrixProviderError::RaggedLine`] when a line
    /// has a different field count from the first data line, and
    /// [`DenseMatrixProviderError::Features`] when no rows were read or a value
    /// is not finite.
    ///
    /// # Examples
    /// ```
    /// use nngraph_providers_dense::DenseMatrixProvider;
    ///
    /// let text = "# x,y\n0,0\n1,0.5\n";
    /// let provider = DenseMatrixProvider::try_from_delimited_reader("demo", text.as_bytes(), ',')
    ///     .expect("valid text");
    /// assert_eq!(provider.len(), 2);
    /// assert_eq!(provider.features().row(1), &[1.0, 0.5]);
    /// ```
    pub fn try_from_delimited_reader<R: BufRead>(
        name: impl Into<String>,
        reader: R,
        delimiter: char,
    ) -> Result<Self, DenseMatrixProviderError> {
        let mut values = Vec::new();
        let mut dimension: Option<usize> = None;
        let mut rows = 0_usize;
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let line_number = index + 1;
            let before = values.len();
            for (field, token) in split_fields(trimmed, delimiter).enumerate() {
                let value = token.parse::<f64>().map_err(|_| {
                    DenseMatrixProviderError::InvalidNumber {
                        line: line_number,
                        field,
                        value: token.to_owned(),
                    }
                })?;
                values.push(value);
            }
            let width = values.len() - before;
            match dimension {
                Some(expected) if expected != width => {
                    return Err(DenseMatrixProviderError::RaggedLine {
                        line: line_number,
                        expected,
                        actual: width,
                    });
                }
                Some(_) => {}
                None => dimension = Some(width),
            }
            rows += 1;
        }
        let dimension = dimension.ok_or(NnGraphError::EmptyFeatures)?;
        debug!(rows, dimension, "delimited features loaded");
        Self::from_row_major(name, dimension, values)
    }
}

fn split_fields(line: &str, delimiter: char) -> Box<dyn Iterator<Item = &str> + '_> {
    if delimiter.is_whitespace() {
        Box::new(line.split_whitespace())
    } else {
        Box::new(line.split(delimiter).map(str::trim))
    }
}
