use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use gtfs::{Color, ColorMapping, GtfsSource, ShapeID, ShapePoint};

use crate::projection::{Edge, Projection};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// A point that landed exactly on an edge of the drawable area, for debugging framing
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryPoint {
    pub shape_id: ShapeID,
    pub lat: f64,
    /// As written in the feed, not flipped
    pub lon: f64,
    pub edges: Vec<Edge>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    pub points: usize,
    pub strokes: usize,
    /// Points belonging to excluded shapes
    pub skipped: usize,
    /// Only filled out when requested
    pub boundary_points: Vec<BoundaryPoint>,
}

pub struct DrawOptions<'a> {
    /// When None, every shape is black and nothing is excluded
    pub colors: Option<&'a ColorMapping>,
    /// When false, the mapping only excludes shapes and everything else is black
    pub use_route_colors: bool,
    pub find_boundary_points: bool,
}

pub fn new_canvas(projection: &Projection) -> RgbImage {
    let size = projection.size();
    RgbImage::from_pixel(size.width, size.height, BACKGROUND)
}

/// Strokes a line between consecutive points of the same shape. The first point of every shape
/// only establishes where the next stroke starts.
pub fn draw_points<I>(
    canvas: &mut RgbImage,
    projection: &Projection,
    points: I,
    opts: &DrawOptions,
) -> Result<RenderStats>
where
    I: IntoIterator<Item = Result<ShapePoint>>,
{
    let mut stats = RenderStats::default();
    let mut last: Option<(ShapeID, (i32, i32))> = None;

    for pt in points {
        let pt = pt?;
        stats.points += 1;

        let color = match opts.colors {
            Some(mapping) => match mapping.color(&pt.shape_id) {
                Some(color) if opts.use_route_colors => color,
                Some(_) => Color::BLACK,
                None => {
                    // A stroke must never bridge over an excluded run of points
                    stats.skipped += 1;
                    last = None;
                    continue;
                }
            },
            None => Color::BLACK,
        };

        let pixel = projection.project(pt.lat, pt.lon);
        if let Some((last_id, last_pixel)) = &last {
            if *last_id == pt.shape_id {
                draw_line_segment_mut(
                    canvas,
                    (last_pixel.0 as f32, last_pixel.1 as f32),
                    (pixel.0 as f32, pixel.1 as f32),
                    Rgb(color.rgb()),
                );
                stats.strokes += 1;
            }
        }

        if opts.find_boundary_points {
            let edges = projection.edges(pixel);
            if !edges.is_empty() {
                stats.boundary_points.push(BoundaryPoint {
                    shape_id: pt.shape_id.clone(),
                    lat: pt.lat,
                    lon: pt.original_lon(),
                    edges,
                });
            }
        }

        last = Some((pt.shape_id, pixel));
    }
    Ok(stats)
}

/// The second pass over a feed's shapes.txt, after the bounding box is known
pub fn draw_source(
    canvas: &mut RgbImage,
    projection: &Projection,
    source: &GtfsSource,
    opts: &DrawOptions,
) -> Result<RenderStats> {
    let points = gtfs::shapes::read(source)?;
    let stats = draw_points(canvas, projection, points, opts)
        .map_err(|err| anyhow!("{source}: {err:#}"))?;
    info!(
        "Drew {} strokes from {} points of {source}, skipping {} excluded points",
        stats.strokes, stats.points, stats.skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gtfs::{Exclusions, RouteID};

    use super::*;
    use crate::{BoundingBox, ImageSize};

    fn pt(id: &str, lat: f64, lon: f64) -> Result<ShapePoint> {
        Ok(ShapePoint {
            shape_id: ShapeID::new(id),
            lat,
            lon,
            sequence: None,
        })
    }

    fn projection() -> Projection {
        let bounds = BoundingBox {
            min_lat: 0.0,
            max_lat: 10.0,
            min_lon: 0.0,
            max_lon: 10.0,
        };
        Projection::new(bounds, ImageSize::fit(110, &bounds).unwrap())
    }

    fn plain() -> DrawOptions<'static> {
        DrawOptions {
            colors: None,
            use_route_colors: false,
            find_boundary_points: false,
        }
    }

    fn mapping(exclusions: &Exclusions) -> ColorMapping {
        let mut route_colors = BTreeMap::new();
        route_colors.insert(RouteID::new("r"), Color::from_hex("ff0000").unwrap());
        ColorMapping::build(
            route_colors,
            vec![(ShapeID::new("A"), RouteID::new("r"))],
            exclusions,
        )
    }

    #[test]
    fn strokes_break_between_shapes() -> Result<()> {
        let p = projection();
        let mut canvas = new_canvas(&p);
        let stats = draw_points(
            &mut canvas,
            &p,
            vec![pt("A", 0.0, 0.0), pt("A", 10.0, 0.0), pt("B", 0.0, 10.0)],
            &plain(),
        )?;
        assert_eq!(3, stats.points);
        assert_eq!(1, stats.strokes);

        // The A stroke runs along y = 5. Nothing joins (105, 5) to B at (5, 105).
        assert_eq!(Rgb([0, 0, 0]), *canvas.get_pixel(50, 5));
        assert_eq!(BACKGROUND, *canvas.get_pixel(55, 55));
        Ok(())
    }

    #[test]
    fn same_shape_after_another_does_not_reconnect() -> Result<()> {
        let p = projection();
        let mut canvas = new_canvas(&p);
        let stats = draw_points(
            &mut canvas,
            &p,
            vec![
                pt("A", 0.0, 0.0),
                pt("B", 5.0, 5.0),
                pt("A", 10.0, 10.0),
                pt("A", 10.0, 0.0),
            ],
            &plain(),
        )?;
        assert_eq!(1, stats.strokes);
        Ok(())
    }

    #[test]
    fn route_colors_and_exclusions() -> Result<()> {
        let p = projection();
        let points = || vec![pt("A", 0.0, 0.0), pt("A", 10.0, 0.0)];

        let colors = mapping(&Exclusions::default());
        let mut canvas = new_canvas(&p);
        let opts = DrawOptions {
            colors: Some(&colors),
            use_route_colors: true,
            find_boundary_points: false,
        };
        draw_points(&mut canvas, &p, points(), &opts)?;
        assert_eq!(Rgb([255, 0, 0]), *canvas.get_pixel(50, 5));

        // Colors can still be turned off
        let mut canvas = new_canvas(&p);
        let opts = DrawOptions {
            use_route_colors: false,
            ..opts
        };
        draw_points(&mut canvas, &p, points(), &opts)?;
        assert_eq!(Rgb([0, 0, 0]), *canvas.get_pixel(50, 5));

        let excluded = mapping(&Exclusions::new(["ff0000"]));
        let mut canvas = new_canvas(&p);
        let opts = DrawOptions {
            colors: Some(&excluded),
            use_route_colors: true,
            find_boundary_points: false,
        };
        let stats = draw_points(&mut canvas, &p, points(), &opts)?;
        assert_eq!(0, stats.strokes);
        assert_eq!(2, stats.skipped);
        assert!(canvas.pixels().all(|px| *px == BACKGROUND));
        Ok(())
    }

    #[test]
    fn excluded_runs_are_not_bridged() -> Result<()> {
        let p = projection();
        let colors = mapping(&Exclusions::new(["r"]));
        let mut canvas = new_canvas(&p);
        let opts = DrawOptions {
            colors: Some(&colors),
            use_route_colors: true,
            find_boundary_points: false,
        };
        let stats = draw_points(
            &mut canvas,
            &p,
            vec![pt("B", 0.0, 0.0), pt("A", 5.0, 5.0), pt("B", 10.0, 10.0)],
            &opts,
        )?;
        assert_eq!(0, stats.strokes);
        assert_eq!(1, stats.skipped);
        Ok(())
    }

    #[test]
    fn boundary_points() -> Result<()> {
        let p = projection();
        let mut canvas = new_canvas(&p);
        let opts = DrawOptions {
            find_boundary_points: true,
            ..plain()
        };
        let stats = draw_points(
            &mut canvas,
            &p,
            vec![pt("A", 0.0, 3.0), pt("A", 5.0, 5.0), pt("A", 10.0, 10.0)],
            &opts,
        )?;
        assert_eq!(
            vec![
                BoundaryPoint {
                    shape_id: ShapeID::new("A"),
                    lat: 0.0,
                    lon: -3.0,
                    edges: vec![Edge::MinLat],
                },
                BoundaryPoint {
                    shape_id: ShapeID::new("A"),
                    lat: 10.0,
                    lon: -10.0,
                    edges: vec![Edge::MaxLat, Edge::MaxLon],
                },
            ],
            stats.boundary_points
        );
        Ok(())
    }
}
