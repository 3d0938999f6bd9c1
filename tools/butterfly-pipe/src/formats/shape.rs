//! Shapefile polylines with their attribute rows

use std::path::Path;

use butterfly_common::{Error, Result};
use shapefile::dbase::{FieldValue, Record};
use shapefile::Shape;

use crate::graph::ShapeRecord;

/// Render a DBF value as a tag value; `None` for empty or unsupported fields.
fn field_text(value: FieldValue) -> Option<String> {
    let number = |v: f64| {
        if v.fract() == 0.0 && v.abs() < 1e15 {
            format!("{}", v as i64)
        } else {
            v.to_string()
        }
    };
    match value {
        FieldValue::Character(s) => s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        FieldValue::Memo(s) => Some(s).filter(|s| !s.is_empty()),
        FieldValue::Numeric(v) => v.map(number),
        FieldValue::Float(v) => v.map(|v| number(f64::from(v))),
        FieldValue::Double(v) | FieldValue::Currency(v) => Some(number(v)),
        FieldValue::Integer(v) => Some(v.to_string()),
        FieldValue::Logical(v) => v.map(|b| if b { "yes" } else { "no" }.to_string()),
        _ => None,
    }
}

/// Concatenate polyline parts into one point list.
///
/// A part that starts where the previous one ended does not repeat that point.
fn join_parts<P>(parts: &[Vec<P>], lat_lon: impl Fn(&P) -> (f64, f64)) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    for part in parts {
        for (i, point) in part.iter().map(&lat_lon).enumerate() {
            if i == 0 && points.last() == Some(&point) {
                continue;
            }
            points.push(point);
        }
    }
    points
}

fn convert(shape: Shape, record: Record) -> Result<Option<ShapeRecord>> {
    let points: Vec<(f64, f64)> = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polyline(line) => join_parts(line.parts(), |p| (p.y, p.x)),
        Shape::PolylineM(line) => join_parts(line.parts(), |p| (p.y, p.x)),
        Shape::PolylineZ(line) => join_parts(line.parts(), |p| (p.y, p.x)),
        other => {
            return Err(Error::ShapefileError(format!(
                "expected polyline geometry, found {:?}",
                other.shapetype()
            )))
        }
    };

    let mut tags: Vec<(String, String)> = record
        .into_iter()
        .filter_map(|(name, value)| field_text(value).map(|v| (name.to_lowercase(), v)))
        .collect();
    tags.sort();

    Ok(Some(ShapeRecord { points, tags }))
}

/// Open a shapefile and hand its polylines, one at a time, to `f`.
///
/// Null shapes are skipped; any other non-line geometry is an error.
pub fn with_records<P, T, F>(path: P, f: F) -> Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Iterator<Item = Result<ShapeRecord>>) -> Result<T>,
{
    let mut reader = shapefile::Reader::from_path(path.as_ref())?;
    let mut records = reader
        .iter_shapes_and_records()
        .filter_map(|item| -> Option<Result<ShapeRecord>> {
            match item {
                Ok((shape, record)) => convert(shape, record).transpose(),
                Err(e) => Some(Err(e.into())),
            }
        });
    f(&mut records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::dbase::{self, TableWriterBuilder};
    use shapefile::{Point, Polyline};

    #[test]
    fn test_field_text() {
        assert_eq!(field_text(FieldValue::Numeric(Some(12.0))), Some("12".to_string()));
        assert_eq!(field_text(FieldValue::Numeric(Some(1.5))), Some("1.5".to_string()));
        assert_eq!(field_text(FieldValue::Numeric(None)), None);
        assert_eq!(
            field_text(FieldValue::Character(Some(" primary ".to_string()))),
            Some("primary".to_string())
        );
        assert_eq!(field_text(FieldValue::Character(Some("  ".to_string()))), None);
        assert_eq!(field_text(FieldValue::Logical(Some(true))), Some("yes".to_string()));
    }

    #[test]
    fn test_reads_polylines_with_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roads.shp");

        {
            let table = TableWriterBuilder::new()
                .add_character_field("HIGHWAY".try_into().unwrap(), 20)
                .add_character_field("FROM".try_into().unwrap(), 10)
                .add_character_field("TO".try_into().unwrap(), 10);
            let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

            let line = Polyline::with_parts(vec![
                vec![Point::new(4.0, 50.0), Point::new(4.001, 50.0)],
                vec![Point::new(4.001, 50.0), Point::new(4.002, 50.0)],
            ]);
            let mut record = dbase::Record::default();
            record.insert("HIGHWAY".to_string(), FieldValue::Character(Some("residential".to_string())));
            record.insert("FROM".to_string(), FieldValue::Character(Some("a".to_string())));
            record.insert("TO".to_string(), FieldValue::Character(Some("b".to_string())));
            writer.write_shape_and_record(&line, &record).unwrap();
        }

        let records: Vec<ShapeRecord> = with_records(&path, |records| records.collect()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].points,
            vec![(50.0, 4.0), (50.0, 4.001), (50.0, 4.002)]
        );
        assert_eq!(
            records[0].tags,
            vec![
                ("from".to_string(), "a".to_string()),
                ("highway".to_string(), "residential".to_string()),
                ("to".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_join_parts_keeps_gaps() {
        let parts = vec![
            vec![Point::new(4.0, 50.0), Point::new(4.1, 50.0)],
            vec![Point::new(4.2, 50.0), Point::new(4.3, 50.0)],
            vec![Point::new(4.3, 50.0), Point::new(4.4, 50.0)],
        ];
        let points = join_parts(&parts, |p| (p.y, p.x));
        assert_eq!(
            points,
            vec![(50.0, 4.0), (50.0, 4.1), (50.0, 4.2), (50.0, 4.3), (50.0, 4.4)]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = with_records("/nonexistent/roads.shp", |records| Ok(records.count()));
        assert!(result.is_err());
    }
}
