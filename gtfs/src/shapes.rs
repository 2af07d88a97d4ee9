use std::io::Read;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{GtfsSource, ShapeID, Table};

/// One row of shapes.txt. `lon` is already negated, so increasing values run the way the image's
/// y axis does; everything downstream works in this flipped space.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapePoint {
    pub shape_id: ShapeID,
    pub lat: f64,
    pub lon: f64,
    pub sequence: Option<u32>,
}

impl ShapePoint {
    /// The longitude as written in the feed
    pub fn original_lon(&self) -> f64 {
        -self.lon
    }
}

/// Streams shapes.txt in file order. Points are assumed to already be sorted by
/// `shape_pt_sequence` within each shape; nothing is re-sorted.
pub struct ShapeReader<R> {
    table: Table<R>,
}

/// Opens shapes.txt. Unlike the other tables, this one is required, so a missing file or column
/// is an error.
pub fn read(source: &GtfsSource) -> Result<ShapeReader<Box<dyn Read>>> {
    let file = source
        .open_file("shapes.txt")
        .with_context(|| format!("{source} has no usable shapes.txt"))?;
    ShapeReader::new(file).with_context(|| format!("reading shapes from {source}"))
}

impl<R: Read> ShapeReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let table = Table::new("shapes.txt", reader)?;
        for column in ["shape_id", "shape_pt_lat", "shape_pt_lon"] {
            table.header().require("shapes.txt", column)?;
        }
        Ok(Self { table })
    }

    fn parse(&self, rec: Record) -> Result<ShapePoint> {
        // f64 parsing accepts inf and NaN, which would wreck the bounding box
        for (column, value) in [
            ("shape_pt_lat", rec.shape_pt_lat),
            ("shape_pt_lon", rec.shape_pt_lon),
        ] {
            if !value.is_finite() {
                bail!(
                    "shapes.txt line {}: bad {column}: {value} isn't a coordinate",
                    self.table.line()
                );
            }
        }
        Ok(ShapePoint {
            shape_id: rec.shape_id,
            lat: rec.shape_pt_lat,
            lon: -rec.shape_pt_lon,
            sequence: rec.shape_pt_sequence,
        })
    }
}

impl<R: Read> Iterator for ShapeReader<R> {
    type Item = Result<ShapePoint>;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = match self.table.next()? {
            Ok(rec) => rec,
            Err(err) => return Some(Err(err)),
        };
        Some(self.table.parse(&rec).and_then(|rec| self.parse(rec)))
    }
}

#[derive(Deserialize)]
struct Record {
    shape_id: ShapeID,
    shape_pt_lat: f64,
    shape_pt_lon: f64,
    shape_pt_sequence: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longitude_is_flipped_on_read() -> Result<()> {
        let input = "shape_pt_lon,shape_id,shape_pt_lat,shape_pt_sequence\n\
                     -122.5,A,47.25,1\n\
                     10,A,-3,2\n";
        let points = ShapeReader::new(input.as_bytes())?.collect::<Result<Vec<_>>>()?;
        assert_eq!(
            vec![
                ShapePoint {
                    shape_id: ShapeID::new("A"),
                    lat: 47.25,
                    lon: 122.5,
                    sequence: Some(1),
                },
                ShapePoint {
                    shape_id: ShapeID::new("A"),
                    lat: -3.0,
                    lon: -10.0,
                    sequence: Some(2),
                },
            ],
            points
        );
        assert_eq!(-122.5, points[0].original_lon());
        Ok(())
    }

    #[test]
    fn sequence_is_optional() -> Result<()> {
        let input = "shape_id,shape_pt_lat,shape_pt_lon\nA,1,2\n";
        let points = ShapeReader::new(input.as_bytes())?.collect::<Result<Vec<_>>>()?;
        assert_eq!(None, points[0].sequence);
        Ok(())
    }

    #[test]
    fn missing_required_column() {
        let input = "shape_id,shape_pt_lat,shape_pt_sequence\nA,1,1\n";
        let err = ShapeReader::new(input.as_bytes()).err().unwrap();
        assert!(err.to_string().contains("shape_pt_lon"));
    }

    #[test]
    fn bad_coordinates_name_the_line() -> Result<()> {
        let input = "shape_id,shape_pt_lat,shape_pt_lon\nA,1,2\nA,north,2\n";
        let mut reader = ShapeReader::new(input.as_bytes())?;
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(err.to_string().contains("shape_pt_lat"), "{err}");
        Ok(())
    }

    #[test]
    fn quoted_fields_after_spaces() -> Result<()> {
        let input = "shape_id, shape_pt_lat, shape_pt_lon\n\
                     \"A\", \"47.5\", \"-122.3\"\n";
        let points = ShapeReader::new(input.as_bytes())?.collect::<Result<Vec<_>>>()?;
        assert_eq!(
            vec![ShapePoint {
                shape_id: ShapeID::new("A"),
                lat: 47.5,
                lon: 122.3,
                sequence: None,
            }],
            points
        );
        Ok(())
    }

    #[test]
    fn infinite_and_nan_coordinates_are_rejected() -> Result<()> {
        for (row, column) in [
            ("A,inf,-122.4", "shape_pt_lat"),
            ("A,47.5,-inf", "shape_pt_lon"),
            ("A,NaN,-122.3", "shape_pt_lat"),
        ] {
            let input = format!("shape_id,shape_pt_lat,shape_pt_lon\nA,47.6,-122.3\n{row}\n");
            let mut reader = ShapeReader::new(input.as_bytes())?;
            assert!(reader.next().unwrap().is_ok());
            let err = reader.next().unwrap().unwrap_err().to_string();
            assert!(err.contains("line 3"), "{err}");
            assert!(err.contains(column), "{err}");
        }
        Ok(())
    }

    #[test]
    fn missing_shapes_file_names_the_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source = GtfsSource::open(dir.path())?;
        let err = read(&source).err().unwrap();
        assert!(format!("{err:#}").contains("shapes.txt"));
        Ok(())
    }
}
