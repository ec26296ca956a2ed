//! Type definitions

pub mod coordinates;
pub mod record;
pub mod route;
pub mod stop;

pub use coordinates::*;
pub use record::*;
pub use route::*;
pub use stop::*;
