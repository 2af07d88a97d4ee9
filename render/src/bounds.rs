use anyhow::Result;

use gtfs::{ColorMapping, GtfsSource, ShapePoint};

/// Axis-aligned box around shape points. Longitudes are in the flipped space produced by
/// `gtfs::ShapeReader`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self {
            min_lat: lat,
            max_lat: lat,
            min_lon: lon,
            max_lon: lon,
        }
    }

    pub fn update(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    pub fn union(&self, other: &BoundingBox) -> Self {
        let mut result = *self;
        result.update(other.min_lat, other.min_lon);
        result.update(other.max_lat, other.max_lon);
        result
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}

/// Folds points into `prior`. None only if there was no prior box and no points.
pub fn accumulate<I>(points: I, prior: Option<BoundingBox>) -> Result<Option<BoundingBox>>
where
    I: IntoIterator<Item = Result<ShapePoint>>,
{
    let mut bounds = prior;
    for pt in points {
        let pt = pt?;
        match bounds {
            Some(ref mut b) => b.update(pt.lat, pt.lon),
            None => bounds = Some(BoundingBox::from_point(pt.lat, pt.lon)),
        }
    }
    Ok(bounds)
}

/// One pass over a feed's shapes.txt. If `skip` is given, points of shapes it excludes don't
/// count, so hidden routes don't stretch the frame.
pub fn accumulate_source(
    source: &GtfsSource,
    prior: Option<BoundingBox>,
    skip: Option<&ColorMapping>,
) -> Result<Option<BoundingBox>> {
    let points = gtfs::shapes::read(source)?;
    let points = points.filter(|pt| match (pt, skip) {
        (Ok(pt), Some(mapping)) => !mapping.is_excluded(&pt.shape_id),
        _ => true,
    });
    let bounds = accumulate(points, prior).map_err(|err| anyhow!("{source}: {err:#}"))?;
    if let Some(ref b) = bounds {
        debug!("After {source}, bounds are {b:?}");
    }
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use gtfs::ShapeID;

    use super::*;

    fn pt(id: &str, lat: f64, lon: f64) -> Result<ShapePoint> {
        Ok(ShapePoint {
            shape_id: ShapeID::new(id),
            lat,
            lon,
            sequence: None,
        })
    }

    fn points() -> Vec<Result<ShapePoint>> {
        vec![
            pt("A", 3.0, -1.0),
            pt("A", 4.5, 2.0),
            pt("B", -2.0, 0.5),
            pt("B", 1.0, 7.25),
            pt("C", 0.0, 0.0),
        ]
    }

    #[test]
    fn accumulate_everything() -> Result<()> {
        let b = accumulate(points(), None)?.unwrap();
        assert_eq!(
            BoundingBox {
                min_lat: -2.0,
                max_lat: 4.5,
                min_lon: -1.0,
                max_lon: 7.25,
            },
            b
        );
        assert!(accumulate(Vec::new(), None)?.is_none());
        Ok(())
    }

    #[test]
    fn seeded_accumulation_matches_one_pass() -> Result<()> {
        let whole = accumulate(points(), None)?;
        for split in 1..5 {
            let mut pts = points();
            let second = pts.split_off(split);
            let first_half = accumulate(pts, None)?;
            assert_eq!(whole, accumulate(second, first_half)?);
        }
        Ok(())
    }

    #[test]
    fn union_of_two_sources() {
        let a = BoundingBox {
            min_lat: 0.0,
            max_lat: 1.0,
            min_lon: 5.0,
            max_lon: 6.0,
        };
        let b = BoundingBox {
            min_lat: 1.0,
            max_lat: 2.0,
            min_lon: 4.0,
            max_lon: 5.5,
        };
        let u = a.union(&b);
        assert_eq!((0.0, 2.0), (u.min_lat, u.max_lat));
        assert_eq!((4.0, 6.0), (u.min_lon, u.max_lon));
        assert_eq!(u, b.union(&a));
    }

    #[test]
    fn errors_propagate() {
        let pts = vec![pt("A", 1.0, 1.0), Err(anyhow!("bad line"))];
        assert!(accumulate(pts, None).is_err());
    }
}
