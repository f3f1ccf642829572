mod pesos;
mod secret;

mod helpers;

pub use helpers::parse_boolean_flag;
pub use pesos::{Pesos, PesosConversionError};
pub use secret::Secret;
