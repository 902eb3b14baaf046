use std::error::Error;

pub type DynError = Box<dyn Error + Send + Sync>;

pub mod credentials;
pub mod engine;
pub mod http;
pub mod market_a;
pub mod market_b;
pub mod utils;
