//! ML model inference components

pub mod classifier;
pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;
pub mod tree;

pub use classifier::Classifier;
pub use inference::InferenceDispatcher;
pub use loader::ModelLoader;
