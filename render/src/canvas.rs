use anyhow::Result;

use crate::BoundingBox;

/// Pixels kept free around the drawing, split evenly between the two sides of each axis
pub const MARGIN: u32 = 10;
/// The largest `max_dimension` accepted. A square image this big is already 768MiB of pixels.
pub const MAX_DIMENSION: u32 = 16384;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Fails unless `max_dimension` leaves room inside the margin and fits in memory.
pub fn check_max_dimension(max_dimension: u32) -> Result<()> {
    if max_dimension <= MARGIN {
        bail!("The maximum image dimension must be more than the {MARGIN}px margin, not {max_dimension}");
    }
    if max_dimension > MAX_DIMENSION {
        bail!("The maximum image dimension can be at most {MAX_DIMENSION}px, not {max_dimension}");
    }
    Ok(())
}

impl ImageSize {
    /// The longer geographic axis gets `max_dimension` pixels; neither side exceeds it.
    pub fn fit(max_dimension: u32, bounds: &BoundingBox) -> Result<Self> {
        check_max_dimension(max_dimension)?;
        let lat_span = bounds.lat_span();
        let lon_span = bounds.lon_span();
        if !(lat_span > 0.0) {
            bail!(
                "All shape points have the same latitude {}, so there's nothing to scale. Is there just one point?",
                bounds.min_lat
            );
        }
        if !(lon_span > 0.0) {
            bail!(
                "All shape points have the same longitude {}, so there's nothing to scale. Is there just one point?",
                -bounds.min_lon
            );
        }

        let width = max_dimension;
        let height = scale(width, lon_span / lat_span);
        if height <= max_dimension {
            return Ok(Self { width, height });
        }
        let height = max_dimension;
        let width = scale(height, lat_span / lon_span);
        Ok(Self { width, height })
    }
}

fn scale(fixed: u32, ratio: f64) -> u32 {
    let drawable = f64::from(fixed - MARGIN) * ratio;
    // Anything past u32::MAX is rejected by the caller's comparison anyway
    drawable.round().min(f64::from(u32::MAX - MARGIN)) as u32 + MARGIN
}
