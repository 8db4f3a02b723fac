use super::{DenseMatrixProvider, DenseMatrixProviderError};
use nngraph_core::NnGraphError;
use rstest::rstest;
use std::io::Write;

fn parse(text: &str, delimiter: char) -> Result<DenseMatrixProvider, DenseMatrixProviderError> {
    DenseMatrixProvider::try_from_delimited_reader("text", text.as_bytes(), delimiter)
}

#[rstest]
#[case::comma("1,2\n3, 4\n", ',')]
#[case::tab("1\t2\n3\t4\n", '\t')]
#[case::spaces("  1   2\n3 4  \n", ' ')]
#[case::comments("# header\n\n1;2\n# note\n3;4\n", ';')]
fn delimited_rows_parse(#[case] text: &str, #[case] delimiter: char) {
    let provider = parse(text, delimiter).expect("valid text");
    assert_eq!(provider.len(), 2);
    assert_eq!(provider.dimension(), 2);
    assert_eq!(provider.features().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
}

#[rstest]
fn invalid_numbers_report_their_position() {
    let err = parse("# x,y\n1,2\n3,oops\n", ',').expect_err("not a number");
    assert!(matches!(
        err,
        DenseMatrixProviderError::InvalidNumber { line: 3, field: 1, ref value } if value == "oops"
    ));
}

#[rstest]
fn empty_fields_are_rejected() {
    let err = parse("1,,2\n", ',').expect_err("empty field");
    assert!(matches!(
        err,
        DenseMatrixProviderError::InvalidNumber { line: 1, field: 1, .. }
    ));
}

#[rstest]
fn ragged_lines_are_rejected() {
    let err = parse("1,2\n3,4,5\n", ',').expect_err("ragged");
    assert!(matches!(
        err,
        DenseMatrixProviderError::RaggedLine {
            line: 2,
            expected: 2,
            actual: 3
        }
    ));
}

#[rstest]
#[case::empty("")]
#[case::only_comments("# nothing here\n\n")]
fn inputs_without_rows_are_empty(#[case] text: &str) {
    let err = parse(text, ',').expect_err("no rows");
    assert!(matches!(
        err,
        DenseMatrixProviderError::Features(NnGraphError::EmptyFeatures)
    ));
}

#[rstest]
fn non_finite_values_are_rejected() {
    let err = parse("1,inf\n", ',').expect_err("infinite value");
    assert!(matches!(
        err,
        DenseMatrixProviderError::Features(NnGraphError::NonFiniteFeature { row: 0, column: 1, .. })
    ));
}

#[rstest]
fn delimited_path_round_trips_through_a_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "0.5,1.5").expect("write");
    writeln!(file, "2.5,3.5").expect("write");
    let provider = DenseMatrixProvider::try_from_delimited_path("file", file.path(), ',')
        .expect("file loads");
    assert_eq!(provider.name(), "file");
    assert_eq!(provider.features().row(0), &[0.5, 1.5]);
}
