use crate::app::PackageInfo;
use crate::device::ADB;
use crate::error::{ADBError, ADBResult};
use crate::process::ProcessInfo;
use crate::shell::ShellResult;
use log::debug;
use rayon::prelude::*;
use std::collections::HashMap;

// 每个操作都使用独立连接，跨设备并发不共享任何可变状态，
// 因此 rayon 扇出是安全的；同一设备上的并发命令由设备自行交错。
impl ADB {
    /// 在多个设备上并行执行 shell 命令
    ///
    /// # 参数
    ///
    /// * `serials` - 设备序列号列表
    /// * `command` - 要执行的 shell 命令
    ///
    /// # 返回值
    ///
    /// 返回一个 HashMap，键为设备序列号，值为命令执行结果
    pub fn parallel_shell(
        &self,
        serials: &[&str],
        command: &str,
    ) -> HashMap<String, ADBResult<ShellResult>> {
        serials
            .par_iter()
            .map(|&serial| (serial.to_string(), self.run_shell(serial, command)))
            .collect()
    }

    /// 在多个设备上并行列出已安装的包
    ///
    /// # 参数
    ///
    /// * `serials` - 设备序列号列表
    ///
    /// # 返回值
    ///
    /// 返回一个 HashMap，键为设备序列号，值为包列表
    pub fn parallel_list_packages(
        &self,
        serials: &[&str],
    ) -> HashMap<String, ADBResult<Vec<PackageInfo>>> {
        serials
            .par_iter()
            .map(|&serial| (serial.to_string(), self.list_packages(serial)))
            .collect()
    }

    /// 在多个设备上并行列出进程
    ///
    /// # 参数
    ///
    /// * `serials` - 设备序列号列表
    ///
    /// # 返回值
    ///
    /// 返回一个 HashMap，键为设备序列号，值为进程列表
    pub fn parallel_list_processes(
        &self,
        serials: &[&str],
    ) -> HashMap<String, ADBResult<Vec<ProcessInfo>>> {
        serials
            .par_iter()
            .map(|&serial| (serial.to_string(), self.list_processes(serial)))
            .collect()
    }

    /// 在所有在线设备上执行操作
    ///
    /// # 参数
    ///
    /// * `operation` - 要执行的操作闭包
    ///
    /// # 返回值
    ///
    /// 返回在线设备的操作结果
    pub fn on_all_online_devices<F, T>(
        &self,
        operation: F,
    ) -> ADBResult<HashMap<String, ADBResult<T>>>
    where
        F: Fn(&str) -> ADBResult<T> + Send + Sync,
        T: Send,
    {
        let devices = self.list_devices()?;

        let online: Vec<String> = devices
            .iter()
            .filter(|device| device.is_online())
            .map(|device| device.serial.clone())
            .collect();

        if online.is_empty() {
            return Err(ADBError::DeviceNotFound("没有在线设备".to_string()));
        }

        debug!("在 {} 个在线设备上并行执行操作", online.len());

        Ok(online
            .par_iter()
            .map(|serial| (serial.clone(), operation(serial)))
            .collect())
    }
}
