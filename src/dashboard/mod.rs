/// Static composition of mounted panels
#[allow(clippy::module_inception)]
pub mod dashboard;

pub use dashboard::{Dashboard, MountedPanel, PanelSnapshot, PanelStatus};
