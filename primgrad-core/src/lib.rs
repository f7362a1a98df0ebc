// Déclare les modules principaux de la crate
pub mod dialect;
pub mod grad_check;
pub mod ops;
pub mod rules;
pub mod tensor;
pub mod types;

// Ré-exporte les types de base pour un accès direct via `primgrad_core::...`
pub use tensor::Tensor;
pub use types::DType;

pub mod error;
pub use error::PrimGradError;
