pub mod convert;
pub mod error;
pub mod ncsf;
pub mod player;
pub mod sdat;

pub use convert::{ConvertOptions, Converter};
pub use error::{Error, SequenceError};
pub use ncsf::TagList;
pub use player::{LengthConfig, Time, TimeKind};
pub use sdat::Sdat;
