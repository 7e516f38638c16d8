pub mod config;
pub mod data_io;
pub mod logger;
pub mod math;
pub mod model;
pub mod modis;
pub mod parallel;
pub mod time_utils;

pub use time_utils::*;
