//! Survey file parser.
//!
//! The format is line oriented. Every line is split on `,`, fields are
//! trimmed, and trailing empty fields are dropped, so `-71.0,` is one field.
//!
//! ```text
//! source_device_model,<model>        survey header, any order
//! building,<name>
//! floor,<int>
//! number_of_points,<int>             checked against the points read
//! MACListLength,<int>                readings per point, informational
//! begin_new_point                    optional framing, ignored
//! Coordinate,<x>,<y>                 opens a point
//! Labeled Point[,...]                next line is the orientation line
//! <label>[,...]                      first character is the orientation
//! <value>[,]                         one RSS reading per line ...
//! end_of_point                       ... until this
//! psi_matrix,<rows>,<cols>           followed by <rows> lines of <cols> values
//! ```
//!
//! Unknown lines are ignored. The psi matrix is kept on the [`Dataset`] but
//! plays no part in clustering.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use super::DatasetError;
use crate::point::{ReferencePoint, SurveyMetadata};

/// Auxiliary matrix carried by some surveys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PsiMatrix {
    /// Declared row count.
    pub rows: usize,
    /// Declared column count; every row has exactly this many values.
    pub cols: usize,
    /// Row-major values.
    pub values: Vec<Vec<f64>>,
}

/// Everything read from one survey file.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Survey header.
    pub metadata: SurveyMetadata,
    /// `number_of_points` as declared, if present.
    pub declared_points: Option<usize>,
    /// `MACListLength` as declared, if present.
    pub mac_list_length: Option<usize>,
    /// Points in file order, unclustered.
    pub points: Vec<ReferencePoint>,
    /// The psi matrix, if the file carries one.
    pub psi: Option<PsiMatrix>,
}

/// Open `path` and parse it.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|source| DatasetError::DataUnavailable { path: path.to_path_buf(), source })?;
    let dataset = parse_from(BufReader::new(file), path)?;
    debug!(path = %path.display(), points = dataset.points.len(), "survey loaded");
    Ok(dataset)
}

/// Parse a survey from any buffered reader.
pub fn parse_dataset<R: BufRead>(reader: R) -> Result<Dataset, DatasetError> {
    parse_from(reader, Path::new("<reader>"))
}

fn parse_from<R: BufRead>(reader: R, path: &Path) -> Result<Dataset, DatasetError> {
    let mut ds = Dataset::default();
    let mut orientation_pending = false;
    let mut readings_open = false;
    let mut psi_rows_left = 0usize;
    let mut line_no = 0usize;

    for line in reader.lines() {
        let line = line
            .map_err(|source| DatasetError::DataUnavailable { path: path.to_path_buf(), source })?;
        line_no += 1;
        let trimmed = line.trim();

        if orientation_pending {
            // A blank orientation line stands for an unlabeled point.
            let label = trimmed.chars().next().unwrap_or(' ');
            if let Some(point) = ds.points.last_mut() {
                point.orientation = label;
            }
            orientation_pending = false;
            readings_open = true;
            continue;
        }

        let fields = split_fields(trimmed);
        let Some(&head) = fields.first() else { continue };

        if psi_rows_left > 0 {
            if let Some(psi) = ds.psi.as_mut() {
                if fields.len() != psi.cols {
                    return Err(DatasetError::malformed(
                        line_no,
                        format!("psi row has {} values, expected {}", fields.len(), psi.cols),
                    ));
                }
                let row = fields
                    .iter()
                    .map(|f| finite(f, line_no, "psi value"))
                    .collect::<Result<Vec<_>, _>>()?;
                psi.values.push(row);
            }
            psi_rows_left -= 1;
            continue;
        }

        match head {
            "end_of_point" => readings_open = false,
            "begin_new_point" => {}
            "source_device_model" => {
                ds.metadata.source_device_model = value(&fields).to_owned();
            }
            "building" => ds.metadata.building = value(&fields).to_owned(),
            "floor" => ds.metadata.floor = number(value(&fields), line_no, "floor")?,
            "number_of_points" => {
                ds.declared_points = Some(number(value(&fields), line_no, "number_of_points")?);
            }
            "MACListLength" => {
                ds.mac_list_length = Some(number(value(&fields), line_no, "MACListLength")?);
            }
            "Coordinate" => {
                if fields.len() != 3 {
                    return Err(DatasetError::malformed(line_no, "Coordinate needs x and y"));
                }
                let x = finite(fields[1], line_no, "x coordinate")?;
                let y = finite(fields[2], line_no, "y coordinate")?;
                ds.points.push(ReferencePoint::new(x, y));
                readings_open = false;
            }
            "Labeled Point" => {
                if ds.points.is_empty() {
                    return Err(DatasetError::malformed(line_no, "point body before any Coordinate"));
                }
                orientation_pending = true;
            }
            "psi_matrix" => {
                if fields.len() != 3 {
                    return Err(DatasetError::malformed(line_no, "psi_matrix needs rows and cols"));
                }
                let rows = number(fields[1], line_no, "psi rows")?;
                let cols = number(fields[2], line_no, "psi cols")?;
                ds.psi = Some(PsiMatrix { rows, cols, values: Vec::with_capacity(rows) });
                psi_rows_left = rows;
            }
            reading if readings_open && fields.len() == 1 => {
                let v = finite(reading, line_no, "RSS reading")?;
                if let Some(point) = ds.points.last_mut() {
                    point.features.push(v);
                }
            }
            _ => {}
        }
    }

    if psi_rows_left > 0 {
        return Err(DatasetError::malformed(
            line_no,
            format!("psi matrix truncated, {psi_rows_left} rows missing"),
        ));
    }
    if let Some(declared) = ds.declared_points {
        if declared != ds.points.len() {
            return Err(DatasetError::malformed(
                line_no,
                format!("number_of_points declares {declared} but {} were read", ds.points.len()),
            ));
        }
    }
    if let Some(len) = ds.mac_list_length {
        if let Some(i) = ds.points.iter().position(|p| p.dimension() != len) {
            warn!(point = i, declared = len, found = ds.points[i].dimension(), "MACListLength mismatch");
        }
    }
    Ok(ds)
}

fn split_fields(line: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = line.split(',').map(str::trim).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

fn value<'a>(fields: &[&'a str]) -> &'a str {
    fields.get(1).copied().unwrap_or("")
}

fn number<T: FromStr>(field: &str, line: usize, what: &str) -> Result<T, DatasetError> {
    field
        .parse()
        .map_err(|_| DatasetError::malformed(line, format!("invalid {what} {field:?}")))
}

/// Like [`number`], but `NaN` and the infinities are rejected too.
fn finite(field: &str, line: usize, what: &str) -> Result<f64, DatasetError> {
    let v: f64 = number(field, line, what)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(DatasetError::malformed(line, format!("non-finite {what} {field:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY: &str = "\
source_device_model,Nexus 5
building,Library
floor,3
number_of_points,2
MACListLength,3
Coordinate,1.5,2
Labeled Point,,
N,,
-40,
-71.5,
-90,
end_of_point
Coordinate,4,5
Labeled Point
S
-41
-70
-88
end_of_point
psi_matrix,2,2
0.5,0.25
1,2
";

    #[test]
    fn test_parses_header_points_and_psi() {
        let ds = parse_dataset(SURVEY.as_bytes()).unwrap();
        assert_eq!(ds.metadata.source_device_model, "Nexus 5");
        assert_eq!(ds.metadata.building, "Library");
        assert_eq!(ds.metadata.floor, 3);
        assert_eq!(ds.declared_points, Some(2));
        assert_eq!(ds.mac_list_length, Some(3));

        assert_eq!(ds.points.len(), 2);
        let p = &ds.points[0];
        assert_eq!((p.x, p.y, p.orientation), (1.5, 2.0, 'N'));
        assert_eq!(p.features, vec![-40.0, -71.5, -90.0]);
        assert_eq!(ds.points[1].orientation, 'S');
        assert!(ds.points.iter().all(|p| p.exemplar.is_none()));

        let psi = ds.psi.unwrap();
        assert_eq!((psi.rows, psi.cols), (2, 2));
        assert_eq!(psi.values, vec![vec![0.5, 0.25], vec![1.0, 2.0]]);
    }

    #[test]
    fn test_crlf_and_unknown_lines_are_tolerated() {
        let text = "timestamp,12345\r\nCoordinate,0,0\r\nLabeled Point\r\nE\r\n-50,\r\nend_of_point\r\n";
        let ds = parse_dataset(text.as_bytes()).unwrap();
        assert_eq!(ds.points.len(), 1);
        assert_eq!(ds.points[0].orientation, 'E');
        assert_eq!(ds.points[0].features, vec![-50.0]);
        assert_eq!(ds.declared_points, None);
    }

    #[test]
    fn test_bad_number_reports_line() {
        let text = "Coordinate,0,0\nLabeled Point\nN\n-40\nloud\nend_of_point\n";
        match parse_dataset(text.as_bytes()) {
            Err(DatasetError::Malformed { line, reason }) => {
                assert_eq!(line, 5);
                assert!(reason.contains("RSS reading"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_body_before_coordinate_is_malformed() {
        let text = "Labeled Point\nN\n-40\n";
        assert!(matches!(
            parse_dataset(text.as_bytes()),
            Err(DatasetError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_point_count_mismatch_is_malformed() {
        let text = "number_of_points,3\nCoordinate,0,0\nLabeled Point\nN\n-40\nend_of_point\n";
        assert!(matches!(parse_dataset(text.as_bytes()), Err(DatasetError::Malformed { .. })));
    }

    #[test]
    fn test_psi_row_arity_is_checked() {
        let text = "psi_matrix,1,3\n1,2\n";
        assert!(matches!(
            parse_dataset(text.as_bytes()),
            Err(DatasetError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            parse_dataset("psi_matrix,2,1\n1\n".as_bytes()),
            Err(DatasetError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.csv");
        match load_dataset(&missing) {
            Err(DatasetError::DataUnavailable { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected DataUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_split_fields_drops_trailing_empties() {
        assert_eq!(split_fields("-71.0,"), vec!["-71.0"]);
        assert_eq!(split_fields("Labeled Point,,"), vec!["Labeled Point"]);
        assert_eq!(split_fields("a, b ,c"), vec!["a", "b", "c"]);
        assert!(split_fields("").is_empty());
    }

    #[test]
    fn test_non_finite_numbers_are_malformed() {
        let nan_reading = "Coordinate,0,0\nLabeled Point\nN\nNaN\nend_of_point\n";
        match parse_dataset(nan_reading.as_bytes()) {
            Err(DatasetError::Malformed { line, reason }) => {
                assert_eq!(line, 4);
                assert!(reason.contains("non-finite RSS reading"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }

        for coordinate in ["Coordinate,inf,0", "Coordinate,0,-infinity"] {
            assert!(matches!(
                parse_dataset(coordinate.as_bytes()),
                Err(DatasetError::Malformed { line: 1, .. })
            ));
        }
        assert!(matches!(
            parse_dataset("psi_matrix,1,2\n1,NaN\n".as_bytes()),
            Err(DatasetError::Malformed { line: 2, .. })
        ));
    }
}
