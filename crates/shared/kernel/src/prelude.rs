//! Common imports for feature slices.

pub use crate::domain::config::{ApiConfig, BundleConfig, BundleLayout};
pub use crate::domain::constants::*;
pub use crate::domain::registry::{FeatureSlice, InitializedSlice};
pub use crate::safe_nanoid;

#[cfg(feature = "server")]
pub use crate::server::{ApiState, ApiStateError, ApiStateErrorExt};
