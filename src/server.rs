use crate::device::ADB;
use crate::error::{ADBError, ADBResult};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use std::time::Instant;

/// ADB 服务器状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub running: bool,
    /// `host:version` 返回的内部版本号（十六进制负载解码后的数值）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl ServerStatus {
    fn not_running() -> Self {
        Self {
            running: false,
            version: None,
        }
    }
}

impl ADB {
    /// 查询 ADB 服务器状态
    ///
    /// 连接被拒绝映射为"未运行"而不是错误；成功的 `host:version`
    /// 应答映射为"运行中"并携带版本号。
    pub fn get_status(&self) -> ADBResult<ServerStatus> {
        let mut transport = match self.open_transport() {
            Ok(transport) => transport,
            Err(ADBError::ConnectionRefused(_)) => {
                debug!("端口 {} 无监听者, 服务器未运行", self.config.port);
                return Ok(ServerStatus::not_running());
            }
            Err(e) => return Err(e),
        };

        transport.send_command("host:version")?;
        transport.read_okay()?;
        let payload = transport.read_payload()?;

        let version = std::str::from_utf8(&payload)
            .ok()
            .and_then(|s| u32::from_str_radix(s.trim(), 16).ok());
        if version.is_none() {
            warn!("无法解析服务器版本负载: {:?}", payload);
        }

        Ok(ServerStatus {
            running: true,
            version,
        })
    }

    /// 启动 ADB 服务器
    ///
    /// 服务器已在运行且 `restart_if_running` 为 false 时立即返回当前状态
    /// （幂等空操作）。否则以 `start-server` 参数拉起可执行文件并轮询
    /// `get_status` 直到运行或超时。并发调用被互斥锁串行化，
    /// 不会出现两个调用竞相拉起重复子进程。
    pub fn start_server(&self, restart_if_running: bool) -> ADBResult<ServerStatus> {
        let _guard = self
            .start_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let status = self.get_status()?;
        if status.running {
            if !restart_if_running {
                debug!("服务器已在运行 (版本 {:?}), 跳过启动", status.version);
                return Ok(status);
            }
            info!("服务器已在运行, 按要求重启");
            self.kill_server()?;
        }

        self.reset_shell_v2_probe();
        self.spawn_server_process()?;

        // 轮询直到可达，间隔指数退避
        let started = Instant::now();
        let deadline = self.config.start_timeout();
        let mut delay = std::time::Duration::from_millis(self.config.poll_interval.max(1));

        loop {
            let status = self.get_status()?;
            if status.running {
                info!("ADB 服务器已启动 (版本 {:?})", status.version);
                return Ok(status);
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Err(ADBError::ServerStartTimeout { elapsed });
            }

            std::thread::sleep(delay.min(deadline - elapsed));
            delay = (delay * 2).min(std::time::Duration::from_millis(1000));
        }
    }

    /// 停止 ADB 服务器
    ///
    /// 发送 `host:kill`；连接被拒绝视为已经停止（成功）。
    pub fn kill_server(&self) -> ADBResult<()> {
        let mut transport = match self.open_transport() {
            Ok(transport) => transport,
            Err(ADBError::ConnectionRefused(_)) => {
                debug!("服务器已处于停止状态");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        transport.send_command("host:kill")?;
        match transport.read_okay() {
            Ok(()) => {}
            // 服务器可能在写出应答前就退出了
            Err(ADBError::MalformedResponse(_)) => debug!("服务器在应答 kill 前退出"),
            Err(e) => return Err(e),
        }

        self.reset_shell_v2_probe();
        info!("ADB 服务器已停止");
        Ok(())
    }

    /// 探测服务器是否支持 shell 协议 v2
    ///
    /// 通过 `host:features` 负载中的 `shell_v2` 标记判断，每个服务器会话
    /// 只探测一次；旧版服务器拒绝该命令时按不支持处理。
    pub(crate) fn shell_v2_supported(&self) -> ADBResult<bool> {
        {
            let cache = self
                .shell_v2
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(supported) = *cache {
                return Ok(supported);
            }
        }

        let supported = match self.probe_features() {
            Ok(features) => features
                .split(',')
                .any(|feature| feature.trim() == "shell_v2"),
            Err(ADBError::ProtocolFailure(msg)) => {
                debug!("服务器不支持 host:features ({}), 回退 shell v1", msg);
                false
            }
            Err(e) => return Err(e),
        };

        debug!("shell v2 支持: {}", supported);
        let mut cache = self
            .shell_v2
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cache = Some(supported);
        Ok(supported)
    }

    fn probe_features(&self) -> ADBResult<String> {
        let mut transport = self.open_transport()?;
        transport.send_command("host:features")?;
        transport.read_okay()?;
        let payload = transport.read_payload()?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    fn reset_shell_v2_probe(&self) {
        let mut cache = self
            .shell_v2
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cache = None;
    }

    fn spawn_server_process(&self) -> ADBResult<()> {
        let mut command = Command::new(&self.config.server_path);
        command
            .arg("start-server")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Unix 下放入独立进程组，使服务器完全脱离当前进程
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        info!("启动 ADB 服务器进程: {:?}", self.config.server_path);
        command.spawn().map_err(|e| {
            ADBError::IoError(format!(
                "无法启动 ADB 服务器进程 {:?}: {}",
                self.config.server_path, e
            ))
        })?;

        Ok(())
    }
}
