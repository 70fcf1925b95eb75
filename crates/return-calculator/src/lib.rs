pub mod dividends;
pub mod returns;

pub use dividends::*;
pub use returns::*;
