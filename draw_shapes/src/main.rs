#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use structopt::StructOpt;

use gtfs::Exclusions;
use render::{Options, Rendering};

/// Draw the shapes of one or more GTFS feeds onto one image
#[derive(StructOpt)]
#[structopt(name = "draw_shapes")]
struct Args {
    /// GTFS directories or zip files, followed by the image file to write. The format comes from
    /// the extension, like .png or .jpg
    #[structopt(required = true, min_values = 2, parse(from_os_str))]
    paths: Vec<PathBuf>,
    /// The larger image dimension, in pixels
    #[structopt(long, default_value = "1000")]
    maxdim: u32,
    /// Draw each shape in its route's color, instead of all black
    #[structopt(long)]
    color: bool,
    /// Open the image in the default viewer afterwards
    #[structopt(long)]
    open: bool,
    /// Route IDs or colors (like ff0000) to leave out, separated by commas
    #[structopt(long)]
    exclude: Option<String>,
    /// Don't let excluded routes stretch the bounding box
    #[structopt(long)]
    exclude_from_bounds: bool,
    /// Print the routes of each color, and the points that touch the edge of the image
    #[structopt(long)]
    list_routes: bool,
}

impl Args {
    fn split_paths(&self) -> Result<(&[PathBuf], &Path)> {
        match self.paths.split_last() {
            Some((output, sources)) if !sources.is_empty() => Ok((sources, output.as_path())),
            _ => bail!("Need at least one GTFS source and an output image"),
        }
    }

    fn options(&self) -> Options {
        Options {
            max_dimension: self.maxdim,
            route_colors: self.color,
            exclusions: match self.exclude {
                Some(ref list) => Exclusions::new(list.split(',')),
                None => Exclusions::default(),
            },
            exclude_from_bounds: self.exclude_from_bounds,
            list_routes: self.list_routes,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::from_args();
    let (sources, output) = args.split_paths()?;
    // Fail on a bad output path before doing all the work
    render::output_format(output)?;

    let rendering = render::render(sources, &args.options())?;
    render::save(&rendering.image, output)?;

    if args.list_routes {
        print_routes(&rendering);
    }
    if args.open {
        open_viewer(output);
    }
    Ok(())
}

fn print_routes(rendering: &Rendering) {
    for report in &rendering.sources {
        println!("{}", report.source);
        for (color, routes) in &report.routes_by_color {
            let routes: Vec<String> = routes.iter().map(|r| r.to_string()).collect();
            println!("  {color}: {}", routes.join(", "));
        }
        for pt in &report.stats.boundary_points {
            println!(
                "  shape {} touches {:?} at ({}, {})",
                pt.shape_id, pt.edges, pt.lat, pt.lon
            );
        }
    }
}

// Best-effort; the image is already saved
fn open_viewer(path: &Path) {
    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(path);
    if let Err(err) = cmd.spawn() {
        warn!("Couldn't open {} in a viewer: {err}", path.display());
    }
}
