/// Train a randomized decision forest on the generated hand set

extern crate handrdf;
extern crate clap;
#[macro_use]
extern crate log;
extern crate env_logger;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate error_chain;

use handrdf::db_reader::{GeneratedSetReader, ReadError, SampleReader};
use handrdf::rdf::{ForestTrainContext, ModelError, RandomDecisionForest, TrainError, TrainParams};
use clap::{Arg, App};
use std::fs::File;
use std::io::Write;
use std::str::FromStr;

error_chain!{
    foreign_links {
        Read(ReadError);
        Model(ModelError);
        Train(TrainError);
        IO(std::io::Error);
        Serde(serde_json::Error);
    }
}

pub fn main(){
    use std::process::exit;
    if let Err(e) = main_(){
        eprintln!("Error: {}",e);
        exit(-1);
    }
}

#[inline]
fn tojson<T>(obj: &T, path: &str) -> Result<()>
    where T: serde::Serialize
{
    let json = serde_json::to_string_pretty(obj)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn parse_or<T: FromStr>(args: &clap::ArgMatches, name: &str, default: T) -> Result<T> {
    match args.value_of(name) {
        Some(x) => T::from_str(x).map_err(|_| format!("Invalid value for {}: {}", name, x).into()),
        None => Ok(default),
    }
}

macro_rules! TREE_COUNT_DEFAULT { () => (3usize) }
macro_rules! THREAD_COUNT_DEFAULT { () => (3usize) }
macro_rules! PIXELS_DEFAULT { () => (2000usize) }
macro_rules! NODE_TRAIN_LIMIT_DEFAULT { () => (100usize) }
macro_rules! MAXDEPTH_DEFAULT { () => (20usize) }
macro_rules! OFFSET_RANGE_DEFAULT { () => (30i32) }
macro_rules! THRESHOLD_RANGE_DEFAULT { () => (0.2f32) }

pub fn main_() -> Result<()> {
    env_logger::init();
    let args = App::new("RDF trainer")
        .arg(Arg::with_name("data_dir")
            .short("d")
            .long("datadir")
            .required(true)
            .takes_value(true)
            .help("Directory of the generated hand set"))
        .arg(Arg::with_name("class_prefix")
            .long("class-prefix")
            .takes_value(true)
            .help("Prefix of the class images - Default hand_classes_"))
        .arg(Arg::with_name("depth_prefix")
            .long("depth-prefix")
            .takes_value(true)
            .help("Prefix of the depth images - Default hand_depth_"))
        .arg(Arg::with_name("start")
            .long("start")
            .takes_value(true)
            .help("First sample index - Default 0"))
        .arg(Arg::with_name("stop")
            .long("stop")
            .takes_value(true)
            .help("Sample index to stop at (exclusive) - Default all samples"))
        .arg(Arg::with_name("step")
            .long("step")
            .takes_value(true)
            .help("Use only every n-th sample - Default 1"))
        .arg(Arg::with_name("out_filename")
            .short("o")
            .long("out")
            .takes_value(true)
            .required(true)
            .help("Filename for the trained forest"))
        .arg(Arg::with_name("binary")
            .long("binary")
            .help("Save the forest in the binary format"))
        .arg(Arg::with_name("trees")
            .long("trees")
            .takes_value(true)
            .help(concat!("Number of trees for the forest - Default ", TREE_COUNT_DEFAULT!())))
        .arg(Arg::with_name("threads")
            .long("threads")
            .takes_value(true)
            .help(concat!("Number of trees trained at the same time - Default ", THREAD_COUNT_DEFAULT!())))
        .arg(Arg::with_name("pixels")
            .long("pixels")
            .takes_value(true)
            .help(concat!("Pixels sampled per image - Default ", PIXELS_DEFAULT!())))
        .arg(Arg::with_name("node_limit")
            .long("node-limit")
            .takes_value(true)
            .help(concat!("Decisions tried per node - Default ", NODE_TRAIN_LIMIT_DEFAULT!())))
        .arg(Arg::with_name("maxdepth")
            .long("maxdepth")
            .takes_value(true)
            .help(concat!("Max depth a tree may be grown - Default ", MAXDEPTH_DEFAULT!())))
        .arg(Arg::with_name("offset_range")
            .long("offset-range")
            .takes_value(true)
            .help(concat!("Max pixel offset of a decision - Default ", OFFSET_RANGE_DEFAULT!())))
        .arg(Arg::with_name("threshold_range")
            .long("threshold-range")
            .takes_value(true)
            .help(concat!("Max threshold of a decision - Default ", THRESHOLD_RANGE_DEFAULT!())))
        .arg(Arg::with_name("seed")
            .long("seed")
            .takes_value(true)
            .help("Seed for reproducible training - Default random"))
        .get_matches();

    let rootpath = args.value_of("data_dir").ok_or("Datadir parameter is invalid")?;
    let filename = args.value_of("out_filename").ok_or("No valid output filename")?;
    let reader = GeneratedSetReader::new(rootpath,
                                         args.value_of("class_prefix").unwrap_or("hand_classes_"),
                                         args.value_of("depth_prefix").unwrap_or("hand_depth_"))?;

    let available = reader.available_indices()?;
    let last = match available.last() {
        Some(x) => *x,
        None => bail!("Found 0 samples"),
    };
    let start = parse_or(&args, "start", 0usize)?;
    let stop = parse_or(&args, "stop", last + 1)?;
    let step = parse_or(&args, "step", 1usize)?;
    info!("Reading samples {} to {} (step {})", start, stop, step);
    let samples = reader.load_range(start, stop, step)?;
    if samples.is_empty() {
        bail!("No sample within the given range");
    }

    let seed = match args.value_of("seed") {
        Some(x) => Some(u64::from_str(x).map_err(|_| "Invalid seed")?),
        None => None,
    };
    let params = TrainParams::new(parse_or(&args, "threads", THREAD_COUNT_DEFAULT!())?,
                                  parse_or(&args, "pixels", PIXELS_DEFAULT!())?,
                                  parse_or(&args, "node_limit", NODE_TRAIN_LIMIT_DEFAULT!())?,
                                  parse_or(&args, "maxdepth", MAXDEPTH_DEFAULT!())?)
        .ok_or("Bad parameter for training")?
        .offset_range(parse_or(&args, "offset_range", OFFSET_RANGE_DEFAULT!())?)
        .threshold_range(parse_or(&args, "threshold_range", THRESHOLD_RANGE_DEFAULT!())?)
        .seed(seed);
    if !params.is_valid() {
        bail!("Bad parameter for training");
    }
    let learn_param_filename = format!("{}_param.json", filename);
    tojson(&params, &*learn_param_filename)?;

    let (class_images, depth_images): (Vec<_>, Vec<_>) =
        samples.into_iter().map(|s| (s.classes, s.depth)).unzip();
    let mut forest = RandomDecisionForest::new(parse_or(&args, "trees", TREE_COUNT_DEFAULT!())?);
    info!("Starting Learning");
    let context = ForestTrainContext::new(params, &class_images, &depth_images);
    let reports = forest.train(&context)?;
    for r in reports.iter() {
        info!("Tree {}: {} pixels, {} nodes, {} leaves, depth {}, {} backtracks in {:?}",
              r.tree,
              r.pixel_count,
              r.node_count,
              r.leaf_count,
              r.depth,
              r.backtracks,
              r.elapsed);
    }
    tojson(&reports, &*format!("{}_report.json", filename))?;
    info!("Learned sucessfull");
    if args.is_present("binary") {
        forest.save_binary(filename)?;
    } else {
        forest.save_to_file(filename)?;
    }
    Ok(())
}
