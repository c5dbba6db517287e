//! Pre-trained artifacts shared by every scoring request

pub mod freq_maps;
pub mod scaler;
pub mod store;

pub use freq_maps::FrequencyMaps;
pub use scaler::Scaler;
pub use store::ArtifactStore;
