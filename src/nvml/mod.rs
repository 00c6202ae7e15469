//! NVML abstraction layer
//!
//! Loads the management library at runtime and exposes it through the
//! [`NvmlApi`] trait so callers never see a raw entry point.

pub mod ffi;
pub mod loader;
pub mod native;
pub mod resolver;
pub mod symbols;
pub mod traits;

pub use loader::{default_search_paths, Capability, LoadedLibrary, Loader, LoaderState};
pub use native::{NativeHandle, NativeNvml};
pub use resolver::resolve;
pub use symbols::ApiVersion;
pub use traits::NvmlApi;
