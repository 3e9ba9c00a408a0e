pub mod battery;
pub mod ev_load;
pub mod forecast;
pub mod grid;
pub mod horizon;
pub mod inverter;
pub mod plant;
pub mod time;

pub use battery::Battery;
pub use ev_load::ControlledEvLoad;
pub use forecast::ForecastInterval;
pub use grid::Grid;
pub use horizon::{Horizon, HorizonSpec, Slot};
pub use inverter::{CurtailmentMode, Inverter};
pub use plant::Plant;
