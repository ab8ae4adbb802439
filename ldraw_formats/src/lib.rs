pub mod colors;
pub mod package;
pub mod validate;

pub use colors::{ColorTable, LDrawColor, PartDescription, PartDescriptions, Rgb, part_file_name};
pub use package::{
    Bounds, BuildMod, FlatStep, ModelData, Part, PartCore, Quat, Step, StepPackage, Vec3,
};
pub use validate::ValidationError;
