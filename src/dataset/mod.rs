pub mod assembler;
pub mod class;
pub mod dataset;

pub use assembler::{DatasetAssembler, DatasetConfig, ImageSource, LabeledImage};
pub use class::SignClass;
pub use dataset::Dataset;
