mod bundle;
mod horizon;

pub use bundle::{ObservationRecord, RegionWeather, WeatherBundle, WeatherObservation, WeatherSet};
pub use horizon::{Horizon, STANDARD_HORIZONS};
