//! Platform services consumed by the process and system commands.
//!
//! Commands only see the traits; [`DesktopPlatform`] implements them for
//! the machine the terminal runs on.

mod procfs;
mod services;

pub use services::{
    DesktopPlatform, DiskService, DiskUsage, LoadAverage, LoadService, MemoryInfo, MemoryService,
    ProcessInfo, ProcessService, SystemService,
};
