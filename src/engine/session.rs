//! Model session abstraction
//!
//! The engine talks to models through two object-safe traits: a backend that
//! materializes sessions from an identifier, and the session itself. Both are
//! blocking by contract; the registry and engine run them on the blocking
//! pool. The one concrete backend wraps ONNX Runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while loading or running a model session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),

    #[error("model declares no input tensors")]
    NoInputs,

    #[error("model declares no output tensors")]
    NoOutputs,

    #[error("model produced no output value")]
    BadOutput,

    #[error(transparent)]
    Runtime(#[from] ort::Error),

    #[error("worker thread panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// Bridges the builder-flavored `ort::Error<SessionBuilder>` (carrying a
/// recovery value) into the plain `ort::Error` the `Runtime` variant stores,
/// so `?` works on `SessionBuilder` methods.
impl From<ort::Error<ort::session::builder::SessionBuilder>> for SessionError {
    fn from(e: ort::Error<ort::session::builder::SessionBuilder>) -> Self {
        SessionError::Runtime(e.into())
    }
}

/// Minimal owned tensor: an f32 buffer plus its dimensions.
///
/// The engine treats this as opaque; only the domain layer and the backend
/// interpret the layout (NCHW for the cutout model).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor. The product of `shape` must equal `data.len()`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor{:?}", self.shape)
    }
}

/// A loaded, ready-to-run compute session.
///
/// `run` is blocking (a full forward pass); callers must not invoke it on a
/// runtime worker thread.
pub trait ModelSession: Send + Sync {
    fn run(&self, input: Tensor) -> Result<Tensor, SessionError>;
}

/// Materializes sessions from a model identifier (a file path for the ONNX
/// backend). `load` is blocking: file I/O plus session construction.
pub trait SessionBackend: Send + Sync {
    fn load(&self, id: &str) -> Result<Box<dyn ModelSession>, SessionError>;
}

/// ONNX Runtime backend.
pub struct OrtBackend {
    intra_threads: usize,
}

impl OrtBackend {
    /// `intra_threads` caps ONNX Runtime's per-session intra-op parallelism,
    /// keeping one forward pass from monopolizing the host's cores.
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }
}

impl SessionBackend for OrtBackend {
    fn load(&self, id: &str) -> Result<Box<dyn ModelSession>, SessionError> {
        let path = Path::new(id);
        if !path.is_file() {
            return Err(SessionError::NotFound(path.to_path_buf()));
        }

        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?
            .commit_from_file(path)?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .ok_or(SessionError::NoInputs)?;
        let output_name = session
            .outputs()
            .first()
            .map(|o| o.name().to_string())
            .ok_or(SessionError::NoOutputs)?;

        tracing::debug!(model = id, input = %input_name, output = %output_name, "session created");

        Ok(Box::new(OrtSession {
            session: std::sync::Mutex::new(session),
            input_name,
            output_name,
        }))
    }
}

/// A single ONNX Runtime session. The first graph input and output are used,
/// matching the segmentation models this service runs.
struct OrtSession {
    session: std::sync::Mutex<ort::session::Session>,
    input_name: String,
    output_name: String,
}

impl ModelSession for OrtSession {
    fn run(&self, input: Tensor) -> Result<Tensor, SessionError> {
        let dims: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let value = ort::value::Tensor::from_array((dims, input.into_data()))?;

        let mut guard = self.session.lock().map_err(|e| SessionError::Other(e.to_string()))?;
        let outputs = guard.run(ort::inputs![self.input_name.as_str() => value])?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or(SessionError::BadOutput)?;

        let (shape, data) = output.try_extract_tensor::<f32>()?;
        Ok(Tensor::new(
            shape.iter().map(|&d| d as usize).collect(),
            data.to_vec(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tensor_accessors() {
        let t = Tensor::new(vec![1, 2, 3], vec![0.0; 6]);
        assert_eq!(t.shape(), &[1, 2, 3]);
        assert_eq!(t.data().len(), 6);
        assert_eq!(t.into_data().len(), 6);
    }

    #[test]
    fn ort_backend_missing_file() {
        let backend = OrtBackend::new(1);
        let err = backend.load("/nonexistent/model.onnx").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }
}
