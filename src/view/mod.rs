mod borrowed;
mod owned;
pub(crate) mod raw;

pub use borrowed::*;
pub use owned::*;

#[cfg(feature = "builder")]
mod builder;
#[cfg(feature = "builder")]
pub use builder::*;
