//! Weather lookups against wttr.in

mod wttr_client;

pub use wttr_client::WeatherClient;
