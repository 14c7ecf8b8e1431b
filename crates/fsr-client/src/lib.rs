pub mod executor;
pub mod media;
pub mod transport;

pub use executor::*;
pub use media::*;
pub use transport::*;
