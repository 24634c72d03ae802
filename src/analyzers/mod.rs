pub mod clustering;
pub mod kmeans;
pub mod pca;
pub mod scaler;

pub use clustering::ClusteringEngine;
pub use kmeans::{KMeans, KMeansResult};
pub use pca::Pca;
pub use scaler::StandardScaler;
