// Stoa common library - main library exports

pub mod address;
pub mod asset;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod params;
pub mod plutus;
pub mod tx;

// Flattened re-exports
pub use self::address::*;
pub use self::asset::*;
pub use self::error::*;
pub use self::hash::*;
pub use self::params::*;
pub use self::plutus::*;
pub use self::tx::*;
