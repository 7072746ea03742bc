pub mod booking;
pub mod schemas;
pub mod seat;
pub mod showtime;

pub use booking::*;
pub use schemas::*;
pub use seat::*;
pub use showtime::*;
