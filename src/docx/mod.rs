pub mod extract;
pub mod model;
pub mod package;
pub mod synth;
pub mod xml;
