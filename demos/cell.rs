use clap::Parser;
use log::info;
use nalgebra::{Point3, Vector3};

use csg_rule::geometry::{Plane, PlaneSet};
use csg_rule::{parse, SimplifyConfig};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Cell rule over surfaces 1-12, e.g. "1 -2 3 -4 5 -6".
    #[arg(value_name = "RULE", default_value = "7 -8 9 -10 11 -12 #1")]
    rule: String,

    /// Starting point of the ray.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [0.0, -3.0, 0.0], allow_hyphen_values = true)]
    origin: Vec<f64>,

    /// Direction of the ray.
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], default_values_t = [0.0, 1.0, 0.0], allow_hyphen_values = true)]
    direction: Vec<f64>,

    /// Run the exhaustive redundancy elimination.
    #[clap(long)]
    eliminate: bool,

    /// Print the rule as a Graphviz graph.
    #[clap(long)]
    dot: bool,
}

/// Surfaces 1-6 bound the box [-1, 1]^3 and surfaces 7-12 the box [-5, 5]^3.
/// Region 1 is the inner box.
fn nested_boxes() -> color_eyre::Result<PlaneSet> {
    let mut planes = PlaneSet::new();
    for (offset, half) in [(0, 1.0), (6, 5.0)] {
        planes.insert(offset + 1, Plane::py(-half));
        planes.insert(offset + 2, Plane::py(half));
        planes.insert(offset + 3, Plane::px(-half));
        planes.insert(offset + 4, Plane::px(half));
        planes.insert(offset + 5, Plane::pz(-half));
        planes.insert(offset + 6, Plane::pz(half));
    }
    planes.insert_region(1, parse("1 -2 3 -4 5 -6")?);
    Ok(planes)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Cli::parse();
    println!("args = {:?}", args);

    let planes = nested_boxes()?;
    let mut tree = parse(&args.rule)?;
    println!("rule = {}", tree.display());
    println!("surfaces = {:?}", tree.surface_ids());
    println!("regions = {:?}", tree.region_ids());
    println!("models = {}", tree.model_count());

    if tree.simplify()? {
        println!("simplified = {}", tree.display());
    }

    let config = SimplifyConfig::default();
    let (cnf, rewrites) = tree.to_cnf(&config)?;
    println!("distributed ({} rewrites) = {}", rewrites, cnf.display());

    if args.eliminate {
        let redundant = tree.eliminate_redundant(&config)?;
        println!("redundant = {:?}", redundant);
        println!("reduced = {}", tree.display());
    }

    let origin = Point3::new(args.origin[0], args.origin[1], args.origin[2]);
    let direction = Vector3::new(args.direction[0], args.direction[1], args.direction[2]).normalize();
    println!("inside at origin: {}", tree.is_valid(&planes, &origin)?);

    let mut position = origin;
    let mut travelled = 0.0;
    while let Some(hit) = tree.track_surf(&planes, &position, &direction)? {
        travelled += hit.distance;
        info!("crossed {} at {:.3} (total {:.3})", hit.surface, hit.distance, travelled);
        position = hit.point;
    }
    println!("ray leaves every boundary after {:.3}", travelled);

    if args.dot {
        println!("{}", tree.to_dot()?);
    }

    Ok(())
}
