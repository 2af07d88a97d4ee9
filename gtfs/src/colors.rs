use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;

use super::{routes, trips, Color, GtfsSource, RouteID, ShapeID};

/// Routes and colors the user asked to hide. Each entry matches a `route_id` exactly, and entries
/// that look like colors (`ff0000`, `#FF0000`) also match every route with that color.
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
    route_ids: BTreeSet<String>,
    colors: BTreeSet<Color>,
}

impl Exclusions {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut result = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if let Some(color) = Color::from_hex(entry.strip_prefix('#').unwrap_or(entry)) {
                result.colors.insert(color);
            }
            result.route_ids.insert(entry.to_string());
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.route_ids.is_empty()
    }

    pub fn excludes_route(&self, route: &RouteID) -> bool {
        self.route_ids.contains(route.as_str())
    }

    pub fn excludes_color(&self, color: &Color) -> bool {
        self.colors.contains(color)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeStyle {
    Color(Color),
    /// Neither measured nor drawn
    Exclude,
}

/// How to draw each shape of one feed, from joining routes.txt and trips.txt
#[derive(Clone, Debug, Default)]
pub struct ColorMapping {
    shapes: BTreeMap<ShapeID, ShapeStyle>,
    route_colors: BTreeMap<RouteID, Color>,
}

impl ColorMapping {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Joins the two tables. A `shape_id` used by several routes keeps the last one seen.
    pub fn build(
        route_colors: BTreeMap<RouteID, Color>,
        shape_routes: Vec<(ShapeID, RouteID)>,
        exclusions: &Exclusions,
    ) -> Self {
        let mut shapes = BTreeMap::new();
        for (shape_id, route_id) in shape_routes {
            let color = route_colors.get(&route_id);
            if exclusions.excludes_route(&route_id)
                || color.map(|c| exclusions.excludes_color(c)).unwrap_or(false)
            {
                shapes.insert(shape_id, ShapeStyle::Exclude);
            } else if let Some(color) = color {
                shapes.insert(shape_id, ShapeStyle::Color(*color));
            }
        }
        Self {
            shapes,
            route_colors,
        }
    }

    pub fn style(&self, shape: &ShapeID) -> Option<ShapeStyle> {
        self.shapes.get(shape).cloned()
    }

    pub fn is_excluded(&self, shape: &ShapeID) -> bool {
        self.style(shape) == Some(ShapeStyle::Exclude)
    }

    /// None for excluded shapes. Shapes without a route color are black.
    pub fn color(&self, shape: &ShapeID) -> Option<Color> {
        match self.style(shape) {
            Some(ShapeStyle::Color(color)) => Some(color),
            Some(ShapeStyle::Exclude) => None,
            None => Some(Color::BLACK),
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Every colored route, grouped by its color
    pub fn routes_by_color(&self) -> BTreeMap<Color, Vec<RouteID>> {
        let mut result: BTreeMap<Color, Vec<RouteID>> = BTreeMap::new();
        for (route, color) in &self.route_colors {
            result
                .entry(*color)
                .or_insert_with(Vec::new)
                .push(route.clone());
        }
        result
    }
}

/// Never fails: coloring is optional, so any problem with routes.txt or trips.txt is logged and
/// the feed is drawn with the default color.
pub fn resolve(source: &GtfsSource, exclusions: &Exclusions) -> ColorMapping {
    match try_resolve(source, exclusions) {
        Ok(mapping) => {
            debug!("{source}: {} shapes have a color or are excluded", mapping.len());
            mapping
        }
        Err(err) => {
            warn!("{source}: {err:#}; using the default color");
            ColorMapping::empty()
        }
    }
}

fn try_resolve(source: &GtfsSource, exclusions: &Exclusions) -> Result<ColorMapping> {
    for name in ["routes.txt", "trips.txt"] {
        if !source.has_file(name) {
            bail!("no {name}");
        }
    }
    let routes = match routes::load_colors(source.open_file("routes.txt")?)? {
        Some(routes) => routes,
        None => bail!("routes.txt is missing route_id or route_color"),
    };
    if !routes.invalid.is_empty() {
        info!(
            "{source}: {} routes with an invalid route_color are drawn black",
            routes.invalid.len()
        );
    }
    let shape_routes = match trips::load_shape_routes(source.open_file("trips.txt")?)? {
        Some(pairs) => pairs,
        None => bail!("trips.txt is missing route_id or shape_id"),
    };
    Ok(ColorMapping::build(
        routes.colors,
        shape_routes,
        exclusions,
    ))
}
