//! Device enumeration report
//!
//! Lists every device the backend sees, for operator-facing output.
//! The listing stops at the first device whose handle, name or PCI info
//! cannot be read.

use crate::domain::GpuInfo;
use crate::error::NvmlError;
use crate::nvml::NvmlApi;

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Query that stopped the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    Handle,
    Name,
    PciInfo,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStage::Handle => write!(f, "handle"),
            ReportStage::Name => write!(f, "name query"),
            ReportStage::PciInfo => write!(f, "PCI ID query"),
        }
    }
}

/// Failure that ended the listing early
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFailure {
    pub index: u32,
    pub stage: ReportStage,
    pub message: String,
}

impl fmt::Display for ReportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPU {} {} failed: {}", self.index, self.stage, self.message)
    }
}

/// Devices listed before the first failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub device_count: u32,
    pub devices: Vec<GpuInfo>,
    pub failure: Option<ReportFailure>,
}

impl DeviceReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Indices never queried because the listing stopped
    pub fn unreached(&self) -> Range<u32> {
        match &self.failure {
            Some(failure) => failure.index.saturating_add(1)..self.device_count,
            None => self.device_count..self.device_count,
        }
    }
}

/// Enumerate every device visible to `api`
///
/// Only a failed device count is an error. A failure on one device ends
/// the listing and is recorded in the report.
pub fn enumerate<A: NvmlApi + ?Sized>(api: &A) -> Result<DeviceReport, NvmlError> {
    let device_count = api.device_count().inspect_err(|e| {
        log::error!("NVML: Device number query failed: {e}");
    })?;
    log::info!("Number of NVML devices: {device_count}");

    let mut report = DeviceReport {
        device_count,
        devices: Vec::with_capacity(device_count as usize),
        failure: None,
    };

    for index in 0..device_count {
        match describe(api, index) {
            Ok(info) => {
                log::info!("{info}");
                report.devices.push(info);
            }
            Err((stage, err)) => {
                let failure = ReportFailure {
                    index,
                    stage,
                    message: err.to_string(),
                };
                log::error!("NVML: {failure}");
                report.failure = Some(failure);
                break;
            }
        }
    }

    Ok(report)
}

fn describe<A: NvmlApi + ?Sized>(api: &A, index: u32) -> Result<GpuInfo, (ReportStage, NvmlError)> {
    let gpu = api
        .handle_by_index(index)
        .map_err(|e| (ReportStage::Handle, e))?;
    let name = api.name(gpu).map_err(|e| (ReportStage::Name, e))?;
    let pci = api.pci_info(gpu).map_err(|e| (ReportStage::PciInfo, e))?;
    Ok(GpuInfo::new(index, name, &pci))
}
