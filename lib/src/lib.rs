pub mod error;
pub mod model;
pub mod session;
pub mod source;
pub mod subcommands;
pub mod utils;

pub use error::{EncodingError, Error, Result};
pub use session::{Phase, TrainingContext, TrainingHandle, TrainingStatus};
pub use source::DataSource;
