pub mod error;
pub mod metrics;
pub mod statements;
pub mod traits;
pub mod types;

pub use error::*;
pub use traits::*;
pub use types::*;
