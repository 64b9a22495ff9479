#[macro_use]
extern crate serde;

#[macro_use]
extern crate log;

mod audit;
mod booth;
mod cipher;
mod encoder;
mod error;
mod frame;
mod matcher;
mod policy;
mod receipt;
mod store;
mod template;

pub use audit::*;
pub use booth::*;
pub use cipher::*;
pub use encoder::*;
pub use error::*;
pub use frame::*;
pub use matcher::*;
pub use policy::*;
pub use receipt::*;
pub use store::*;
pub use template::*;
