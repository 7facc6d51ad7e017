use std::fmt;

/// Where a tensor's storage lives.
///
/// The tag is opaque to the tensor itself; it only selects which compute
/// backend a dispatcher routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    /// Host memory.
    #[default]
    Cpu,
    /// CUDA accelerator with device index.
    Cuda(usize),
}

/// Device family, used as the routing key for compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Cpu,
    Cuda,
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Cpu => DeviceKind::Cpu,
            Device::Cuda(_) => DeviceKind::Cuda,
        }
    }

    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Device index for accelerators, `None` for the host.
    pub fn index(&self) -> Option<usize> {
        match self {
            Device::Cuda(idx) => Some(*idx),
            Device::Cpu => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(idx) => write!(f, "cuda:{idx}"),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Cuda => write!(f, "cuda"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_index() {
        assert_eq!(Device::Cpu.kind(), DeviceKind::Cpu);
        assert_eq!(Device::Cuda(1).kind(), DeviceKind::Cuda);
        assert_eq!(Device::Cuda(1).index(), Some(1));
        assert_eq!(Device::Cpu.index(), None);
        assert!(Device::default().is_cpu());
    }

    #[test]
    fn test_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(0).to_string(), "cuda:0");
        assert_eq!(DeviceKind::Cuda.to_string(), "cuda");
    }
}
