// Classifier port: trait-based abstraction for swappable toxicity models.
//
// The Classifier trait is the only thing the engine sees. OnnxClassifier runs
// Detoxify locally; PerspectiveClassifier calls Google's Perspective API.
// ClassifierSlot tracks whether a classifier has finished loading, so the
// engine can fall back to the lexical filter in the meantime.

pub mod download;
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod slot;
pub mod traits;

pub use slot::{ClassifierSlot, ClassifierState};
pub use traits::{max_probability, CategoryScore, Classifier};
