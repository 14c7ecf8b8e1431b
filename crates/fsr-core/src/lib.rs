pub mod audit;
pub mod error;
pub mod fixture;
pub mod ids;
pub mod model;
pub mod outcomes;
pub mod response;

pub use audit::*;
pub use error::*;
pub use fixture::*;
pub use ids::*;
pub use model::*;
pub use outcomes::*;
pub use response::*;
