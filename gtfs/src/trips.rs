use std::io::Read;

use anyhow::Result;
use serde::Deserialize;

use super::{RouteID, ShapeID, Table};

/// The `(shape_id, route_id)` of every trip that names a shape, in file order. Returns None if
/// trips.txt lacks either column.
pub fn load_shape_routes<R: Read>(reader: R) -> Result<Option<Vec<(ShapeID, RouteID)>>> {
    let table = Table::new("trips.txt", reader)?;
    if !table.header().contains("route_id") || !table.header().contains("shape_id") {
        return Ok(None);
    }

    let mut results = Vec::new();
    for rec in table.rows() {
        let rec: Record = rec?;
        // shape_id is optional per trip
        if let Some(shape_id) = rec.shape_id {
            results.push((shape_id, rec.route_id));
        }
    }
    Ok(Some(results))
}

#[derive(Deserialize)]
struct Record {
    route_id: RouteID,
    shape_id: Option<ShapeID>,
}
