mod datum;
mod script_data;
mod tx;
mod utxo;
mod witness;

pub use datum::*;
pub use script_data::*;
pub use tx::*;
pub use utxo::*;
pub use witness::*;
