mod config;
mod device;
mod error;
mod server;
mod shell;
mod transport;

// 功能模块
pub mod app;
pub mod parallel;
pub mod process;

// 导出主要类型
pub use app::PackageInfo;
pub use config::{ADBConfig, ADBConfigBuilder, DEFAULT_PORT};
pub use device::{ADB, ADBDevice, DeviceStatus};
pub use error::{ADBError, ADBResult};
pub use process::ProcessInfo;
pub use server::ServerStatus;
pub use shell::ShellResult;
pub use transport::Transport;

// 便利的预导出模块
pub mod prelude {
    pub use super::{
        ADB, ADBConfig, ADBConfigBuilder, ADBDevice, ADBError, ADBResult, DeviceStatus,
        PackageInfo, ProcessInfo, ServerStatus, ShellResult,
    };
}
