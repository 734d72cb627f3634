//! File domain entities.

pub mod model;
pub mod version;

pub use model::File;
pub use version::FileVersion;
