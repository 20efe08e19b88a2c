// Bias classification — trait-based abstraction over the local model.
//
// The BiasClassifier trait defines the interface; OnnxBiasClassifier is the
// production implementation. Handlers only see `Arc<dyn BiasClassifier>`.

pub mod onnx;
pub mod traits;

pub use onnx::OnnxBiasClassifier;
pub use traits::{BiasClassifier, BiasDistribution, BiasLabel};
