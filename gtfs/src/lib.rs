#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod colors;
mod ids;
mod routes;
pub mod shapes;
mod source;
mod table;
mod trips;

pub use colors::{resolve as resolve_colors, ColorMapping, Exclusions, ShapeStyle};
pub use ids::{RouteID, ShapeID};
pub use routes::{load_colors as load_route_colors, Color, RouteColors};
pub use shapes::{ShapePoint, ShapeReader};
pub use source::GtfsSource;
pub use table::{parse_row, Header, Table};
pub use trips::load_shape_routes;
