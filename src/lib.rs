extern crate rand;
#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate rayon;

#[macro_use]
extern crate lazy_static;
extern crate byteorder;
extern crate regex;
extern crate image;

#[macro_use]
extern crate log;

#[macro_use]
pub mod vecmat;
pub mod types;
pub mod classes;
pub mod skeleton;

pub mod db_reader;

pub mod rdf;
pub mod meanshift;
pub mod extractor;
