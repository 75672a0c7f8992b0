pub mod aggregate;
pub mod calibrate;
pub mod channels;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod signal;
pub mod taxonomy;
pub mod types;

pub use config::{ArtifactConfigDoc, CalibrationConfig, CalibrationOverrides, EegConfig};
pub use error::EegError;
pub use model::artifacts::{ArtifactBundle, ArtifactStore, DirArtifactStore};
pub use pipeline::builder::EegPipelineBuilder;
pub use pipeline::cache::EngineCache;
pub use pipeline::runtime::EegPipeline;
pub use pipeline::traits::ClassifierBackend;
pub use signal::quality::{QualityScorer, RobustAmplitudeScorer, StdRatioScorer};
pub use taxonomy::{ClassLabel, ClassTaxonomy};
pub use types::{
    DecodedRecording, InferOptions, InferenceResult, RecordingSource, SelectedWindow,
};
