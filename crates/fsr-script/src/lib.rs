pub mod loader;
pub mod model;
pub mod profile;

pub use loader::*;
pub use model::*;
pub use profile::*;
