// Stoa transaction assembly - main library exports

mod builder;
mod fee;
mod flows;
mod wallet;

pub use builder::*;
pub use fee::*;
pub use flows::*;
pub use wallet::*;
