//! Domain model: devices, their checks and the published snapshot.

pub mod check;
pub mod device;
pub mod snapshot;

pub use check::{
    Check, CheckKind, CheckType, DEFAULT_DSCP, DEFAULT_MEDIA_GROUP, DEFAULT_MEDIA_PORT, DEFAULT_PTP_MULTICAST,
    DEFAULT_PTP_PORTS, HttpMethod, RavennaService,
};
pub use device::Device;
pub use snapshot::{CheckSnapshot, DeviceSnapshot, Snapshot};
