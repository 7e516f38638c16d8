pub mod bilinear;
pub mod interpolate;


pub use bilinear::*;
pub use interpolate::*;
