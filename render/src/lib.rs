#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod bounds;
mod canvas;
mod draw;
mod projection;

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use anyhow::Result;
use image::{ImageFormat, RgbImage};

use gtfs::{Color, ColorMapping, Exclusions, GtfsSource, RouteID};

pub use bounds::{accumulate, accumulate_source, BoundingBox};
pub use canvas::{check_max_dimension, ImageSize, MARGIN, MAX_DIMENSION};
pub use draw::{
    draw_points, draw_source, new_canvas, BoundaryPoint, DrawOptions, RenderStats, BACKGROUND,
};
pub use projection::{Edge, Projection};

#[derive(Clone, Debug)]
pub struct Options {
    /// The longer side of the image, in pixels
    pub max_dimension: u32,
    /// Draw shapes in their route's color, instead of all black
    pub route_colors: bool,
    pub exclusions: Exclusions,
    /// Leave excluded shapes out of the bounding box too, not just the drawing
    pub exclude_from_bounds: bool,
    /// Collect route colors and boundary-touching points for each source
    pub list_routes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_dimension: 1000,
            route_colors: false,
            exclusions: Exclusions::default(),
            exclude_from_bounds: false,
            list_routes: false,
        }
    }
}

pub struct SourceReport {
    pub source: GtfsSource,
    /// Empty unless colors were resolved for this source
    pub routes_by_color: BTreeMap<Color, Vec<RouteID>>,
    pub stats: RenderStats,
}

pub struct Rendering {
    pub image: RgbImage,
    pub bounds: BoundingBox,
    pub size: ImageSize,
    pub sources: Vec<SourceReport>,
}

/// Draws the shapes of every source onto one image, in order, so later sources paint over earlier
/// ones. All sources are framed by one bounding box, and every bounding box pass finishes before
/// anything is drawn.
pub fn render<P: AsRef<Path>>(paths: &[P], opts: &Options) -> Result<Rendering> {
    if paths.is_empty() {
        bail!("No GTFS sources given");
    }
    check_max_dimension(opts.max_dimension)?;
    // Catch bad paths before reading anything
    let sources = paths
        .iter()
        .map(GtfsSource::open)
        .collect::<Result<Vec<_>>>()?;

    let needs_colors = opts.route_colors || !opts.exclusions.is_empty() || opts.list_routes;
    let mappings: Vec<Option<ColorMapping>> = sources
        .iter()
        .map(|source| {
            if needs_colors {
                Some(gtfs::resolve_colors(source, &opts.exclusions))
            } else {
                None
            }
        })
        .collect();

    let mut bounds = None;
    for (source, mapping) in sources.iter().zip(&mappings) {
        let skip = if opts.exclude_from_bounds {
            mapping.as_ref()
        } else {
            None
        };
        bounds = accumulate_source(source, bounds, skip)?;
    }
    let bounds = match bounds {
        Some(b) => b,
        None => bail!("There are no shape points to draw"),
    };
    let size = ImageSize::fit(opts.max_dimension, &bounds)?;
    info!(
        "Drawing latitude {} to {}, longitude {} to {} onto a {}x{} image",
        bounds.min_lat,
        bounds.max_lat,
        -bounds.max_lon,
        -bounds.min_lon,
        size.width,
        size.height
    );

    let projection = Projection::new(bounds, size);
    let mut image = new_canvas(&projection);
    let mut reports = Vec::new();
    for (source, mapping) in sources.into_iter().zip(mappings) {
        let draw_opts = DrawOptions {
            colors: mapping.as_ref(),
            use_route_colors: opts.route_colors,
            find_boundary_points: opts.list_routes,
        };
        let stats = draw_source(&mut image, &projection, &source, &draw_opts)?;
        reports.push(SourceReport {
            routes_by_color: mapping
                .map(|m| m.routes_by_color())
                .unwrap_or_default(),
            source,
            stats,
        });
    }

    Ok(Rendering {
        image,
        bounds,
        size,
        sources: reports,
    })
}

/// Figures out the image format from the file extension.
pub fn output_format(path: &Path) -> Result<ImageFormat> {
    let format = ImageFormat::from_path(path)
        .map_err(|err| anyhow!("Can't pick an image format for {}: {err}", path.display()))?;
    if !format.writing_enabled() {
        bail!("Can't write {:?} images like {}", format, path.display());
    }
    Ok(format)
}

/// Encodes the whole image before touching the output path, so a failure doesn't leave a
/// partial file behind.
pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    let format = output_format(path)?;
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .map_err(|err| anyhow!("Encoding {}: {err}", path.display()))?;
    fs_err::write(path, bytes.into_inner())?;
    info!("Wrote {}", path.display());
    Ok(())
}
