use crate::{BoundingBox, ImageSize, MARGIN};

/// Maps the bounding box onto an image, leaving half the margin on every side.
///
/// Latitude runs along the x axis and (flipped) longitude along the y axis. This is not the usual
/// map orientation, but it's how these renderings have always been laid out.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    bounds: BoundingBox,
    size: ImageSize,
}

impl Projection {
    /// The box must have a nonzero span on both axes; `ImageSize::fit` checks that.
    pub fn new(bounds: BoundingBox, size: ImageSize) -> Self {
        Self { bounds, size }
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn project(&self, lat: f64, lon: f64) -> (i32, i32) {
        let x = (lat - self.bounds.min_lat) * f64::from(self.size.width - MARGIN)
            / self.bounds.lat_span();
        let y = (lon - self.bounds.min_lon) * f64::from(self.size.height - MARGIN)
            / self.bounds.lon_span();
        let half = (MARGIN / 2) as i32;
        (x.round() as i32 + half, y.round() as i32 + half)
    }

    /// Inverse of `project`, up to the rounding to whole pixels
    pub fn unproject(&self, x: i32, y: i32) -> (f64, f64) {
        let half = f64::from(MARGIN / 2);
        let lat = self.bounds.min_lat
            + (f64::from(x) - half) * self.bounds.lat_span() / drawable(self.size.width);
        let lon = self.bounds.min_lon
            + (f64::from(y) - half) * self.bounds.lon_span() / drawable(self.size.height);
        (lat, lon)
    }

    /// Which edges of the drawable area a pixel lies on
    pub fn edges(&self, (x, y): (i32, i32)) -> Vec<Edge> {
        let low = (MARGIN / 2) as i32;
        let mut edges = Vec::new();
        if x == low {
            edges.push(Edge::MinLat);
        }
        if x == self.size.width as i32 - low {
            edges.push(Edge::MaxLat);
        }
        if y == low {
            edges.push(Edge::MinLon);
        }
        if y == self.size.height as i32 - low {
            edges.push(Edge::MaxLon);
        }
        edges
    }
}

// A side collapsed to the margin still has one pixel to avoid dividing by zero
fn drawable(side: u32) -> f64 {
    f64::from(side.saturating_sub(MARGIN).max(1))
}

/// Edges are named by the flipped coordinates used for projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    MinLat,
    MaxLat,
    MinLon,
    MaxLon,
}
