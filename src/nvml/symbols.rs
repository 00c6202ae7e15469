//! Entry-point binding table
//!
//! Each logical NVML operation lists its candidate symbol names in
//! preference order. Resolution walks the table once at load time and
//! records which name, and therefore which API version, was bound.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

/// NVML API generation a symbol belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// `_v2`-suffixed entry points
    V2,
    /// Unsuffixed entry points
    Legacy,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V2 => write!(f, "v2"),
            ApiVersion::Legacy => write!(f, "legacy"),
        }
    }
}

/// Logical operations bound from the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Shutdown,
    ErrorString,
    DeviceCount,
    HandleByIndex,
    PciInfo,
    Name,
    Temperature,
    FanSpeed,
    ClockInfo,
    DefaultClock,
    PowerUsage,
    PowerLimit,
}

impl Operation {
    /// Unversioned entry-point name, used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Init => "nvmlInit",
            Operation::Shutdown => "nvmlShutdown",
            Operation::ErrorString => "nvmlErrorString",
            Operation::DeviceCount => "nvmlDeviceGetCount",
            Operation::HandleByIndex => "nvmlDeviceGetHandleByIndex",
            Operation::PciInfo => "nvmlDeviceGetPciInfo",
            Operation::Name => "nvmlDeviceGetName",
            Operation::Temperature => "nvmlDeviceGetTemperature",
            Operation::FanSpeed => "nvmlDeviceGetFanSpeed",
            Operation::ClockInfo => "nvmlDeviceGetClockInfo",
            Operation::DefaultClock => "nvmlDeviceGetDefaultApplicationsClock",
            Operation::PowerUsage => "nvmlDeviceGetPowerUsage",
            Operation::PowerLimit => "nvmlDeviceGetPowerManagementLimit",
        }
    }
}

/// How an operation picks its candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// First candidate that resolves wins
    Independent,
    /// Only the candidate matching the version chosen for `Init`
    ///
    /// Enumeration and PCI info must agree with init: their structures
    /// change size between versions.
    LockedToInit,
}

/// One candidate symbol name
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub name: &'static str,
    pub version: ApiVersion,
}

const fn v2(name: &'static str) -> Candidate {
    Candidate {
        name,
        version: ApiVersion::V2,
    }
}

const fn legacy(name: &'static str) -> Candidate {
    Candidate {
        name,
        version: ApiVersion::Legacy,
    }
}

/// Binding rule for one operation
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub operation: Operation,
    pub scope: Scope,
    pub candidates: &'static [Candidate],
}

/// Init binding; its outcome selects the version for locked operations
pub const INIT: Binding = Binding {
    operation: Operation::Init,
    scope: Scope::Independent,
    candidates: &[v2("nvmlInit_v2"), legacy("nvmlInit")],
};

/// All other bindings, resolved after `INIT`
pub const BINDINGS: &[Binding] = &[
    Binding {
        operation: Operation::DeviceCount,
        scope: Scope::LockedToInit,
        candidates: &[v2("nvmlDeviceGetCount_v2"), legacy("nvmlDeviceGetCount")],
    },
    Binding {
        operation: Operation::HandleByIndex,
        scope: Scope::LockedToInit,
        candidates: &[
            v2("nvmlDeviceGetHandleByIndex_v2"),
            legacy("nvmlDeviceGetHandleByIndex"),
        ],
    },
    Binding {
        operation: Operation::PciInfo,
        scope: Scope::LockedToInit,
        candidates: &[v2("nvmlDeviceGetPciInfo_v2"), legacy("nvmlDeviceGetPciInfo")],
    },
    Binding {
        operation: Operation::ErrorString,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlErrorString")],
    },
    Binding {
        operation: Operation::Name,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetName")],
    },
    Binding {
        operation: Operation::Temperature,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetTemperature")],
    },
    Binding {
        operation: Operation::FanSpeed,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetFanSpeed")],
    },
    Binding {
        operation: Operation::ClockInfo,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetClockInfo")],
    },
    Binding {
        operation: Operation::DefaultClock,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetDefaultApplicationsClock")],
    },
    Binding {
        operation: Operation::PowerUsage,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetPowerUsage")],
    },
    Binding {
        operation: Operation::PowerLimit,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlDeviceGetPowerManagementLimit")],
    },
    Binding {
        operation: Operation::Shutdown,
        scope: Scope::Independent,
        candidates: &[legacy("nvmlShutdown")],
    },
];

/// Address of a resolved symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSymbol(NonNull<c_void>);

// SAFETY: a symbol address is written once at load time and only read
// afterwards; the library it points into outlives every RawSymbol copy
// held by the capability.
unsafe impl Send for RawSymbol {}
unsafe impl Sync for RawSymbol {}

impl RawSymbol {
    /// Wrap a symbol address, rejecting null
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterpret the address as a typed function pointer
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the symbol's real C
    /// signature.
    pub unsafe fn cast<F: Copy>(&self) -> F {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>()
        );
        std::mem::transmute_copy::<*mut c_void, F>(&self.as_ptr())
    }
}

/// A symbol bound for an operation
#[derive(Debug, Clone, Copy)]
pub struct Resolved {
    pub name: &'static str,
    pub version: ApiVersion,
    pub symbol: RawSymbol,
}

/// Outcome of binding every operation
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<Operation, Resolved>,
}

impl SymbolTable {
    /// Resolve all bindings through `lookup`
    ///
    /// Returns `None` if no init candidate resolves; in that case nothing
    /// past `INIT` is looked up.
    pub fn resolve<F>(mut lookup: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<RawSymbol>,
    {
        let mut table = SymbolTable::default();

        let init = resolve_binding(&INIT, None, &mut lookup)?;
        table.entries.insert(Operation::Init, init);

        for binding in BINDINGS {
            if let Some(resolved) = resolve_binding(binding, Some(init.version), &mut lookup) {
                table.entries.insert(binding.operation, resolved);
            }
        }

        Some(table)
    }

    pub fn get(&self, operation: Operation) -> Option<&Resolved> {
        self.entries.get(&operation)
    }

    pub fn is_resolved(&self, operation: Operation) -> bool {
        self.entries.contains_key(&operation)
    }

    /// Version chosen for init, which enumeration shares
    pub fn init_version(&self) -> Option<ApiVersion> {
        self.get(Operation::Init).map(|r| r.version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve_binding<F>(
    binding: &Binding,
    init_version: Option<ApiVersion>,
    lookup: &mut F,
) -> Option<Resolved>
where
    F: FnMut(&str) -> Option<RawSymbol>,
{
    binding
        .candidates
        .iter()
        .filter(|c| match (binding.scope, init_version) {
            (Scope::LockedToInit, Some(version)) => c.version == version,
            _ => true,
        })
        .find_map(|c| {
            let symbol = lookup(c.name)?;
            log::debug!(
                "NVML: bound {:?} to {} ({})",
                binding.operation,
                c.name,
                c.version
            );
            Some(Resolved {
                name: c.name,
                version: c.version,
                symbol,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fake_symbol() -> RawSymbol {
        RawSymbol::new(0x1000 as *mut c_void).unwrap()
    }

    fn table_with(names: &[&str]) -> Option<SymbolTable> {
        let available: HashSet<&str> = names.iter().copied().collect();
        SymbolTable::resolve(|name| available.contains(name).then(fake_symbol))
    }

    #[test]
    fn test_prefers_v2_init() {
        let table = table_with(&["nvmlInit_v2", "nvmlInit"]).unwrap();
        assert_eq!(table.init_version(), Some(ApiVersion::V2));
        assert_eq!(table.get(Operation::Init).unwrap().name, "nvmlInit_v2");
    }

    #[test]
    fn test_falls_back_to_legacy_init() {
        let table = table_with(&["nvmlInit", "nvmlDeviceGetCount"]).unwrap();
        assert_eq!(table.init_version(), Some(ApiVersion::Legacy));
        assert_eq!(
            table.get(Operation::DeviceCount).unwrap().name,
            "nvmlDeviceGetCount"
        );
    }

    #[test]
    fn test_no_init_symbol_fails() {
        assert!(table_with(&["nvmlDeviceGetCount_v2", "nvmlShutdown"]).is_none());
    }

    #[test]
    fn test_enumeration_locked_to_init_version() {
        // v2 init with only legacy enumeration symbols: must not mix
        let table = table_with(&[
            "nvmlInit_v2",
            "nvmlDeviceGetCount",
            "nvmlDeviceGetHandleByIndex",
            "nvmlDeviceGetPciInfo",
        ])
        .unwrap();
        assert!(!table.is_resolved(Operation::DeviceCount));
        assert!(!table.is_resolved(Operation::HandleByIndex));
        assert!(!table.is_resolved(Operation::PciInfo));
    }

    #[test]
    fn test_optional_symbols_resolve_independently() {
        let table = table_with(&[
            "nvmlInit_v2",
            "nvmlDeviceGetTemperature",
            "nvmlDeviceGetPowerUsage",
        ])
        .unwrap();
        assert!(table.is_resolved(Operation::Temperature));
        assert!(table.is_resolved(Operation::PowerUsage));
        assert!(!table.is_resolved(Operation::FanSpeed));
        assert!(!table.is_resolved(Operation::DefaultClock));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_init_is_resolved_before_other_bindings() {
        let mut order = Vec::new();
        let _ = SymbolTable::resolve(|name| {
            order.push(name.to_string());
            None
        });
        assert_eq!(order, vec!["nvmlInit_v2", "nvmlInit"]);
    }

    #[test]
    fn test_raw_symbol_rejects_null() {
        assert!(RawSymbol::new(std::ptr::null_mut()).is_none());
    }
}
