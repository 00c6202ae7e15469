//! Telemetry query façade
//!
//! Bus-addressed reads over an [`NvmlApi`] backend. Every query resolves
//! the device again and folds each failed backend call into the
//! "unknown" value of its own field, so partial readings survive.

use crate::domain::{
    BusId, ClockDomain, ClockSample, ClockSpeed, DeviceIds, PowerSample, ThermalSample,
};
use crate::error::NvmlError;
use crate::nvml::{resolve, NvmlApi};

/// Keep a reading, or drop it to `None` with a trace line
fn reading<T>(bus: BusId, what: &str, result: Result<T, NvmlError>) -> Option<T> {
    result
        .inspect_err(|e| log::trace!("GPU bus {bus}: {what} unavailable: {e}"))
        .ok()
}

/// Read-only telemetry for devices addressed by PCI bus
pub struct Telemetry<A> {
    api: A,
}

impl<A: NvmlApi> Telemetry<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn handle(&self, bus: BusId) -> Option<A::Handle> {
        let handle = resolve(&self.api, bus);
        if handle.is_none() {
            log::trace!("GPU bus {bus}: no matching device");
        }
        handle
    }

    /// Temperature and fan speed
    pub fn thermal(&self, bus: BusId) -> ThermalSample {
        let Some(gpu) = self.handle(bus) else {
            return ThermalSample::UNKNOWN;
        };
        ThermalSample {
            temperature: reading(bus, "temperature", self.api.temperature(gpu)),
            fan: reading(bus, "fan speed", self.api.fan_speed(gpu)),
        }
    }

    /// Current SM and memory clocks
    pub fn clocks(&self, bus: BusId) -> ClockSample {
        let Some(gpu) = self.handle(bus) else {
            return ClockSample::UNKNOWN;
        };
        ClockSample {
            core: reading(bus, "SM clock", self.api.clock(gpu, ClockDomain::Sm))
                .unwrap_or_default(),
            memory: reading(bus, "memory clock", self.api.clock(gpu, ClockDomain::Memory))
                .unwrap_or_default(),
        }
    }

    /// Default applications clocks for graphics and memory
    ///
    /// Reports zeros without touching the device when the library lacks
    /// the entry point.
    pub fn default_clocks(&self, bus: BusId) -> ClockSample {
        if !self.api.supports_default_clocks() {
            return ClockSample::UNKNOWN;
        }
        let Some(gpu) = self.handle(bus) else {
            return ClockSample::UNKNOWN;
        };
        let read = |domain, what| {
            reading(bus, what, self.api.default_clock(gpu, domain)).unwrap_or(ClockSpeed::new(0))
        };
        ClockSample {
            core: read(ClockDomain::Graphics, "default graphics clock"),
            memory: read(ClockDomain::Memory, "default memory clock"),
        }
    }

    /// Power draw and limit
    pub fn power(&self, bus: BusId) -> PowerSample {
        let Some(gpu) = self.handle(bus) else {
            return PowerSample::UNKNOWN;
        };
        PowerSample {
            usage: reading(bus, "power usage", self.api.power_usage(gpu)).unwrap_or_default(),
            limit: reading(bus, "power limit", self.api.power_limit(gpu)).unwrap_or_default(),
        }
    }

    /// Vendor, device and subsystem ids
    ///
    /// PCI info is read again after resolution and must still report the
    /// requested bus; otherwise the ids are all zero.
    pub fn device_ids(&self, bus: BusId) -> DeviceIds {
        let Some(gpu) = self.handle(bus) else {
            return DeviceIds::UNKNOWN;
        };
        let Some(pci) = reading(bus, "PCI info", self.api.pci_info(gpu)) else {
            return DeviceIds::UNKNOWN;
        };
        if pci.bus() != bus {
            log::trace!("GPU bus {bus}: PCI info now reports bus {}", pci.bus());
            return DeviceIds::UNKNOWN;
        }
        DeviceIds::from_pci(&pci)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Temperature;
    use crate::mock::{MockDevice, MockNvml};
    use crate::nvml::symbols::Operation;

    fn telemetry(devices: Vec<MockDevice>) -> Telemetry<MockNvml> {
        Telemetry::new(MockNvml::new(devices))
    }

    #[test]
    fn test_unknown_bus_returns_sentinels() {
        let t = telemetry(vec![MockDevice::new(1), MockDevice::new(2)]);
        let bus = BusId::new(9);

        let thermal = t.thermal(bus);
        assert_eq!(thermal.temperature_or_sentinel(), -1.0);
        assert_eq!(thermal.fan_or_sentinel(), -1);

        let clocks = t.clocks(bus);
        assert_eq!((clocks.core.as_mhz(), clocks.memory.as_mhz()), (0, 0));
        assert_eq!(t.default_clocks(bus), ClockSample::UNKNOWN);

        let power = t.power(bus);
        assert_eq!((power.usage_watts(), power.limit_watts()), (0, 0));

        assert_eq!(t.device_ids(bus), DeviceIds::UNKNOWN);
    }

    #[test]
    fn test_partial_thermal_reading() {
        let t = telemetry(vec![MockDevice::new(1)
            .with_temperature(Temperature::from_celsius(67))
            .failing(Operation::FanSpeed)]);

        let sample = t.thermal(BusId::new(1));
        assert_eq!(sample.temperature_or_sentinel(), 67.0);
        assert_eq!(sample.fan_or_sentinel(), -1);
    }

    #[test]
    fn test_clocks_use_sm_and_memory() {
        let t = telemetry(vec![MockDevice::new(4)
            .with_clock(ClockDomain::Sm, 1905)
            .with_clock(ClockDomain::Graphics, 1200)
            .with_clock(ClockDomain::Memory, 7001)]);

        let clocks = t.clocks(BusId::new(4));
        assert_eq!(clocks.core.as_mhz(), 1905);
        assert_eq!(clocks.memory.as_mhz(), 7001);
    }

    #[test]
    fn test_clock_failure_is_per_domain() {
        let t = telemetry(vec![MockDevice::new(4).failing(Operation::ClockInfo)]);
        assert_eq!(t.clocks(BusId::new(4)), ClockSample::UNKNOWN);
    }

    #[test]
    fn test_default_clocks() {
        let t = telemetry(vec![MockDevice::new(2)]);
        let clocks = t.default_clocks(BusId::new(2));
        assert_eq!(clocks.core.as_mhz(), 1410);
        assert_eq!(clocks.memory.as_mhz(), 9501);
    }

    #[test]
    fn test_default_clocks_unsupported_makes_no_call() {
        let t = Telemetry::new(MockNvml::with_buses(3).without_default_clocks());
        assert_eq!(t.default_clocks(BusId::new(1)), ClockSample::UNKNOWN);
        assert_eq!(t.api().total_calls(), 0);
    }

    #[test]
    fn test_power_floors_to_watts() {
        let t = telemetry(vec![
            MockDevice::new(0).with_power(999, 1000),
            MockDevice::new(1).with_power(250_999, 320_000),
        ]);

        let low = t.power(BusId::new(0));
        assert_eq!((low.usage_watts(), low.limit_watts()), (0, 1));

        let high = t.power(BusId::new(1));
        assert_eq!((high.usage_watts(), high.limit_watts()), (250, 320));
    }

    #[test]
    fn test_power_limit_failure_keeps_usage() {
        let t = telemetry(vec![MockDevice::new(0)
            .with_power(120_000, 300_000)
            .failing(Operation::PowerLimit)]);

        let power = t.power(BusId::new(0));
        assert_eq!(power.usage_watts(), 120);
        assert_eq!(power.limit_watts(), 0);
    }

    #[test]
    fn test_device_ids_split_words() {
        let t = telemetry(vec![MockDevice::new(5).with_pci_ids(0x2684_10DE, 0x1671_1462)]);

        let ids = t.device_ids(BusId::new(5));
        assert_eq!(ids.vendor_id, 0x10DE);
        assert_eq!(ids.device_id, 0x2684);
        assert_eq!(ids.subsystem_vendor_id, 0x1462);
        assert_eq!(ids.subsystem_device_id, 0x1671);
    }

    #[test]
    fn test_device_ids_bus_mismatch_is_unknown() {
        let t = telemetry(vec![MockDevice::new(5).relocating_to(6)]);
        assert_eq!(t.device_ids(BusId::new(5)), DeviceIds::UNKNOWN);
        assert_eq!(t.api().calls(Operation::PciInfo), 2);
    }

    #[test]
    fn test_each_query_resolves_again() {
        let t = telemetry(vec![MockDevice::new(3), MockDevice::new(8)]);
        t.thermal(BusId::new(8));
        t.power(BusId::new(8));
        assert_eq!(t.api().calls(Operation::DeviceCount), 2);
    }
}
