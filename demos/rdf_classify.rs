/// Classify a sample of the generated hand set with a trained forest.
/// Writes the class colour image and the localized skeleton.

extern crate handrdf;
extern crate clap;
#[macro_use]
extern crate log;
extern crate env_logger;
extern crate image;
extern crate serde_json;
#[macro_use]
extern crate error_chain;

use handrdf::classes::{classes_to_rgb, HandClass};
use handrdf::db_reader::{GeneratedSetReader, ReadError, SampleReader};
use handrdf::meanshift::JointLocalizer;
use handrdf::rdf::{ForestError, ModelError, RandomDecisionForest};
use handrdf::skeleton::SkeletonError;
use handrdf::types::BACKGROUND_INDEX;
use clap::{Arg, App};
use std::str::FromStr;

error_chain!{
    foreign_links {
        Read(ReadError);
        Model(ModelError);
        Forest(ForestError);
        Skeleton(SkeletonError);
        Image(image::ImageError);
        IO(std::io::Error);
    }
}

pub fn main(){
    use std::process::exit;
    if let Err(e) = main_(){
        eprintln!("Error: {}",e);
        exit(-1);
    }
}

fn main_() -> Result<()> {
    env_logger::init();

    let args = App::new("RDF classify")
        .arg(Arg::with_name("trained")
            .short("t")
            .long("trained")
            .required(true)
            .takes_value(true)
            .help("Filename of the trained forest (text or binary)"))
        .arg(Arg::with_name("db")
            .short("d")
            .long("data")
            .required(true)
            .takes_value(true)
            .help("Directory of the generated hand set"))
        .arg(Arg::with_name("sample")
            .short("n")
            .long("sample")
            .required(true)
            .takes_value(true)
            .help("Index of the sample to classify"))
        .arg(Arg::with_name("out")
            .short("o")
            .long("out")
            .takes_value(true)
            .help("Prefix of the written files - Default classified"))
        .get_matches();

    let model = args.value_of("trained").ok_or("No valid model filename")?;
    let db = args.value_of("db").ok_or("No valid database path")?;
    let index = usize::from_str(args.value_of("sample").ok_or("No sample given")?)
        .map_err(|_| "Sample has to be a number")?;
    let out = args.value_of("out").unwrap_or("classified");

    let forest = RandomDecisionForest::from_file(model)?;
    info!("Loaded forest with {} trees", forest.tree_count());
    let reader = GeneratedSetReader::with_default_prefixes(db)?;
    if !reader.contains(index) {
        bail!("Sample {} not found", index);
    }
    let sample = reader.load(index)?;

    let result = forest.classify_image_parallel(&sample.depth)?;
    let mut correct = 0usize;
    let mut total = 0usize;
    for (x, y, truth) in sample.classes.enumerate_pixels() {
        if truth.0[0] == BACKGROUND_INDEX {
            continue;
        }
        total += 1;
        if result.classes[(x, y)].0[0] == truth.0[0] {
            correct += 1;
        }
    }
    if total > 0 {
        info!("Accuracy: {:.2}% of {} hand pixels",
              100.0 * correct as f64 / total as f64,
              total);
    }

    let class_filename = format!("{}_classes.png", out);
    classes_to_rgb(&result.classes).save(&class_filename)?;
    info!("Wrote {}", class_filename);

    let skeleton = JointLocalizer::new(None)
        .approximate_joints(&sample.depth, &result.weights, &result.best_points);
    for (class, joint) in HandClass::ALL.iter().zip(skeleton.joints()) {
        if joint.is_found() {
            info!("{:?}: {:?} certainty {}", class, joint.location_image, joint.certainty);
        } else {
            info!("{:?}: not found", class);
        }
    }
    skeleton.save_to_file(format!("{}_skeleton.json", out))?;
    Ok(())
}
