pub mod candle;
pub mod instrument;
pub mod pattern;
pub mod session;
pub mod signal;

pub use candle::*;
pub use instrument::*;
pub use pattern::*;
pub use session::*;
pub use signal::*;
