//! Domain types for ReplayLab

pub mod bar;
pub mod metadata;
pub mod order;
pub mod position;
pub mod trade;

pub use bar::Bar;
pub use metadata::Metadata;
pub use order::{Order, OrderAction};
pub use position::{Direction, Position};
pub use trade::Trade;
