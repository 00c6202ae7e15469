//! NVML capability loader
//!
//! Opens the vendor management library at most once per process, binds
//! its entry points through the [`symbols`](crate::nvml::symbols) table
//! and calls init. The resulting [`Capability`] is immutable and is handed
//! by reference to everything that queries the library.
//!
//! ```text
//! Uninitialized --initialize()--> Unavailable
//!                             \-> Usable --shutdown()--> (loader consumed)
//! ```

use crate::error::NvmlError;
use crate::nvml::ffi::{
    c_str_to_string, ClockFn, DeviceCountFn, ErrorStringFn, FanSpeedFn, HandleByIndexFn, InitFn,
    NameFn, PciInfoFn, PowerFn, ReturnCode, ShutdownFn, TemperatureFn,
};
use crate::nvml::symbols::{ApiVersion, Operation, RawSymbol, SymbolTable};

use once_cell::sync::OnceCell;
use std::ffi::{c_void, OsStr};
use std::path::{Path, PathBuf};

/// A loaded shared library that can look up symbols by name
pub trait DynamicLibrary {
    fn symbol(&self, name: &str) -> Option<RawSymbol>;
}

/// Opens shared libraries by path or bare file name
pub trait LibraryOpener {
    type Library: DynamicLibrary;

    /// Open a library, returning `None` if it cannot be loaded
    fn open(&self, path: &OsStr) -> Option<Self::Library>;
}

/// Opener backed by the platform dynamic loader
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl LibraryOpener for SystemOpener {
    type Library = libloading::Library;

    fn open(&self, path: &OsStr) -> Option<Self::Library> {
        // SAFETY: loading NVML runs its initialisers, which have no
        // preconditions on the calling process.
        match unsafe { libloading::Library::new(path) } {
            Ok(lib) => Some(lib),
            Err(e) => {
                log::debug!("NVML: could not open {}: {}", path.to_string_lossy(), e);
                None
            }
        }
    }
}

impl DynamicLibrary for libloading::Library {
    fn symbol(&self, name: &str) -> Option<RawSymbol> {
        // SAFETY: the address is only reinterpreted through the typed
        // signatures in `ffi`, matched per operation in `Entrypoints::bind`.
        let sym = unsafe { self.get::<*mut c_void>(name.as_bytes()) }.ok()?;
        RawSymbol::new(*sym)
    }
}

/// Platform default library locations, search path first
pub fn default_search_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        vec![
            PathBuf::from("libnvidia-ml.so"),
            PathBuf::from("libnvidia-ml.so.1"),
        ]
    }

    #[cfg(windows)]
    {
        let mut paths = vec![PathBuf::from("nvml.dll")];
        if let Some(program_files) = std::env::var_os("ProgramFiles") {
            paths.push(
                PathBuf::from(program_files)
                    .join("NVIDIA Corporation")
                    .join("NVSMI")
                    .join("nvml.dll"),
            );
        }
        paths
    }

    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Vec::new()
    }
}

/// Typed entry points, bound once from the symbol table
#[derive(Debug, Default, Clone, Copy)]
pub struct Entrypoints {
    pub init: Option<InitFn>,
    pub shutdown: Option<ShutdownFn>,
    pub error_string: Option<ErrorStringFn>,
    pub device_count: Option<DeviceCountFn>,
    pub handle_by_index: Option<HandleByIndexFn>,
    pub pci_info: Option<PciInfoFn>,
    pub name: Option<NameFn>,
    pub temperature: Option<TemperatureFn>,
    pub fan_speed: Option<FanSpeedFn>,
    pub clock_info: Option<ClockFn>,
    pub default_clock: Option<ClockFn>,
    pub power_usage: Option<PowerFn>,
    pub power_limit: Option<PowerFn>,
}

impl Entrypoints {
    fn bind(table: &SymbolTable) -> Self {
        fn get<F: Copy>(table: &SymbolTable, operation: Operation) -> Option<F> {
            // SAFETY: every candidate name of an operation shares the C
            // signature of the field it is bound to below.
            table.get(operation).map(|r| unsafe { r.symbol.cast::<F>() })
        }

        Self {
            init: get(table, Operation::Init),
            shutdown: get(table, Operation::Shutdown),
            error_string: get(table, Operation::ErrorString),
            device_count: get(table, Operation::DeviceCount),
            handle_by_index: get(table, Operation::HandleByIndex),
            pci_info: get(table, Operation::PciInfo),
            name: get(table, Operation::Name),
            temperature: get(table, Operation::Temperature),
            fan_speed: get(table, Operation::FanSpeed),
            clock_info: get(table, Operation::ClockInfo),
            default_clock: get(table, Operation::DefaultClock),
            power_usage: get(table, Operation::PowerUsage),
            power_limit: get(table, Operation::PowerLimit),
        }
    }
}

/// An opened library with its bound entry points
pub struct LoadedLibrary<L> {
    entrypoints: Entrypoints,
    symbols: SymbolTable,
    init_status: Result<(), NvmlError>,
    path: PathBuf,
    // Dropped last: every entry point points into it.
    _library: L,
}

impl<L> LoadedLibrary<L> {
    /// Library path or file name that opened
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entrypoints(&self) -> &Entrypoints {
        &self.entrypoints
    }

    /// Version selected for init and enumeration
    pub fn api_version(&self) -> Option<ApiVersion> {
        self.symbols.init_version()
    }

    /// Outcome of the init call
    pub fn init_status(&self) -> &Result<(), NvmlError> {
        &self.init_status
    }

    /// Fetch an entry point, or `NotSupported` if it did not resolve
    pub fn entry<F: Copy>(
        &self,
        operation: Operation,
        pick: impl FnOnce(&Entrypoints) -> Option<F>,
    ) -> Result<F, NvmlError> {
        pick(&self.entrypoints).ok_or(NvmlError::NotSupported(operation.label()))
    }

    /// Turn a return code into a result
    pub fn check(&self, operation: Operation, code: ReturnCode) -> Result<(), NvmlError> {
        if code.is_success() {
            return Ok(());
        }
        Err(NvmlError::Call {
            operation: operation.label(),
            code,
            message: self.error_message(code),
        })
    }

    /// Text for a return code, from `nvmlErrorString` when it resolved
    pub fn error_message(&self, code: ReturnCode) -> String {
        self.entrypoints
            .error_string
            // SAFETY: nvmlErrorString accepts any code and returns a
            // static string or null.
            .and_then(|f| unsafe { c_str_to_string(f(code.0)) })
            .unwrap_or_else(|| code.describe().to_string())
    }

    fn call_init(&self) -> Result<(), NvmlError> {
        let init = self.entry(Operation::Init, |e| e.init)?;
        // SAFETY: nvmlInit takes no arguments.
        let code = ReturnCode(unsafe { init() });
        if code.is_success() {
            return Ok(());
        }
        let message = self.error_message(code);
        log::error!("NVML: Init failed {message}");
        Err(NvmlError::InitializationFailed(message))
    }

    fn call_shutdown(&self) -> Result<(), NvmlError> {
        let Some(shutdown) = self.entrypoints.shutdown else {
            log::debug!("NVML: nvmlShutdown did not resolve, unloading without it");
            return Ok(());
        };
        // SAFETY: nvmlShutdown takes no arguments.
        let code = ReturnCode(unsafe { shutdown() });
        self.check(Operation::Shutdown, code)
    }
}

/// Process-wide NVML capability snapshot
pub enum Capability<L = libloading::Library> {
    /// Monitoring is disabled for the rest of the process
    Unavailable(NvmlError),
    /// The library opened and init resolved
    ///
    /// Init itself may still have failed; see
    /// [`LoadedLibrary::init_status`].
    Usable(LoadedLibrary<L>),
}

impl<L> Capability<L> {
    /// The process-wide "monitoring disabled" flag
    pub fn is_disabled(&self) -> bool {
        matches!(self, Capability::Unavailable(_))
    }

    pub fn library(&self) -> Option<&LoadedLibrary<L>> {
        match self {
            Capability::Usable(lib) => Some(lib),
            Capability::Unavailable(_) => None,
        }
    }

    /// Why monitoring is disabled, or why init failed
    pub fn error(&self) -> Option<&NvmlError> {
        match self {
            Capability::Unavailable(err) => Some(err),
            Capability::Usable(lib) => lib.init_status.as_ref().err(),
        }
    }
}

impl<L> std::fmt::Debug for Capability<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Unavailable(err) => f.debug_tuple("Unavailable").field(err).finish(),
            Capability::Usable(lib) => f
                .debug_struct("Usable")
                .field("path", &lib.path)
                .field("version", &lib.api_version())
                .field("symbols", &lib.symbols.len())
                .field("init", &lib.init_status)
                .finish(),
        }
    }
}

/// Observable loader state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Uninitialized,
    Unavailable,
    Usable,
}

/// One-shot NVML loader
///
/// `initialize` opens and binds on its first call only; later calls
/// return the same snapshot without touching the opener.
pub struct Loader<O: LibraryOpener = SystemOpener> {
    opener: O,
    search_paths: Vec<PathBuf>,
    capability: OnceCell<Capability<O::Library>>,
}

impl Loader<SystemOpener> {
    /// Loader over the platform defaults followed by `extra_paths`
    pub fn new(extra_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths = default_search_paths();
        paths.extend(extra_paths);
        Self::with_opener(SystemOpener, paths)
    }
}

impl<O: LibraryOpener> Loader<O> {
    /// Loader trying `search_paths` in order through `opener`
    pub fn with_opener(opener: O, search_paths: Vec<PathBuf>) -> Self {
        Self {
            opener,
            search_paths,
            capability: OnceCell::new(),
        }
    }

    /// Load the library and bind it, once
    pub fn initialize(&self) -> &Capability<O::Library> {
        self.capability
            .get_or_init(|| load(&self.opener, &self.search_paths))
    }

    pub fn state(&self) -> LoaderState {
        match self.capability.get() {
            None => LoaderState::Uninitialized,
            Some(Capability::Unavailable(_)) => LoaderState::Unavailable,
            Some(Capability::Usable(_)) => LoaderState::Usable,
        }
    }

    /// Shut NVML down and unload the library
    ///
    /// Consumes the loader, so nothing can query through it afterwards.
    /// A no-op unless init succeeded. The library is released even when
    /// `nvmlShutdown` is missing or fails.
    pub fn shutdown(self) -> Result<(), NvmlError> {
        let Some(Capability::Usable(lib)) = self.capability.into_inner() else {
            return Ok(());
        };
        if lib.init_status.is_err() {
            return Ok(());
        }
        lib.call_shutdown()
    }
}

fn load<O: LibraryOpener>(opener: &O, search_paths: &[PathBuf]) -> Capability<O::Library> {
    let opened = search_paths
        .iter()
        .find_map(|path| opener.open(path.as_os_str()).map(|lib| (path.clone(), lib)));

    let Some((path, library)) = opened else {
        log::info!("Unable to load the NVIDIA Management Library");
        return Capability::Unavailable(NvmlError::LibraryNotFound);
    };

    let Some(symbols) = SymbolTable::resolve(|name| library.symbol(name)) else {
        log::error!("NVML: Unable to initialise");
        return Capability::Unavailable(NvmlError::SymbolMissing(Operation::Init.label()));
    };

    log::debug!(
        "NVML: opened {} ({} entry points, {:?} API)",
        path.display(),
        symbols.len(),
        symbols.init_version()
    );

    let mut loaded = LoadedLibrary {
        entrypoints: Entrypoints::bind(&symbols),
        symbols,
        init_status: Ok(()),
        path,
        _library: library,
    };
    loaded.init_status = loaded.call_init();
    Capability::Usable(loaded)
}
