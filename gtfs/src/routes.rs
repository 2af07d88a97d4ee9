use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;

use anyhow::Result;
use serde::Deserialize;

use super::{RouteID, Table};

/// A `route_color`: exactly six hex digits, without the leading `#`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        red: 0,
        green: 0,
        blue: 0,
    };

    /// None unless the input is exactly six characters, all hex digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
        Some(Self {
            red: channel(0)?,
            green: channel(2)?,
            blue: channel(4)?,
        })
    }

    /// Lowercase, without the leading `#`
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

pub struct RouteColors {
    pub colors: BTreeMap<RouteID, Color>,
    /// Routes whose `route_color` was present but malformed. They're black in `colors`.
    pub invalid: BTreeSet<RouteID>,
}

/// Returns None if routes.txt lacks `route_id` or `route_color`. Routes with an empty color get
/// no entry at all.
pub fn load_colors<R: Read>(reader: R) -> Result<Option<RouteColors>> {
    let table = Table::new("routes.txt", reader)?;
    if !table.header().contains("route_id") || !table.header().contains("route_color") {
        return Ok(None);
    }

    let mut result = RouteColors {
        colors: BTreeMap::new(),
        invalid: BTreeSet::new(),
    };
    for rec in table.rows() {
        let rec: Record = rec?;
        let raw = match rec.route_color {
            Some(raw) => raw,
            None => continue,
        };
        match Color::from_hex(&raw) {
            Some(color) => {
                result.colors.insert(rec.route_id, color);
            }
            None => {
                warn!(
                    "Route {} has invalid route_color {raw:?}, drawing it black",
                    rec.route_id
                );
                result.colors.insert(rec.route_id.clone(), Color::BLACK);
                result.invalid.insert(rec.route_id);
            }
        }
    }
    Ok(Some(result))
}

#[derive(Deserialize)]
struct Record {
    route_id: RouteID,
    route_color: Option<String>,
}
