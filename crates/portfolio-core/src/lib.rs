pub mod error;
pub mod models;
pub mod series;
pub mod value;

pub use error::*;
pub use models::*;
pub use series::*;
pub use value::*;
