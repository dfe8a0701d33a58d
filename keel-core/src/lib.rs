mod arguments;
mod audit;
mod builder;
mod command;
mod data_source;
mod dialect;
mod error;
mod materializer;
mod metadata;
mod options;
mod row;
mod token;
mod util;
mod value;

pub use arguments::*;
pub use audit::*;
pub use builder::*;
pub use command::*;
pub use data_source::*;
pub use dialect::*;
pub use error::*;
pub use materializer::*;
pub use metadata::*;
pub use options::*;
pub use row::*;
pub use token::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::tokio_util::sync::CancellationToken;
