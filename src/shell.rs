use crate::device::ADB;
use crate::error::{ADBError, ADBResult};
use crate::transport::Transport;
use log::{debug, trace};

// shell v2 流中的包标识
const ID_STDOUT: u8 = 1;
const ID_STDERR: u8 = 2;
const ID_EXIT: u8 = 3;

/// 一次 shell 命令执行的结果快照
///
/// v1 协议不区分流也不汇报退出码: stderr 为空, exit_code 为 None。
#[derive(Debug, Clone, Default)]
pub struct ShellResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl ShellResult {
    /// stdout 的宽松 UTF-8 文本视图
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// stderr 的宽松 UTF-8 文本视图
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// 退出码为 0 或未知时视为成功
    pub fn success(&self) -> bool {
        matches!(self.exit_code, None | Some(0))
    }

    /// 退出码存在且非零时转换为 CommandFailed
    pub(crate) fn into_checked(self) -> ADBResult<ShellResult> {
        match self.exit_code {
            Some(code) if code != 0 => Err(ADBError::CommandFailed {
                code,
                stderr: self.stderr_lossy(),
            }),
            _ => Ok(self),
        }
    }
}

impl ADB {
    /// 在指定设备上执行 shell 命令
    ///
    /// 打开新连接, 先用 `host:transport:<serial>` 绑定设备
    /// （失败映射为 `DeviceNotFound`, 设备可能在枚举后断开），
    /// 再按服务器能力选择 `shell,v2,raw:` 或 `shell:` 通道，
    /// 读取输出流直到对端关闭连接。
    pub fn run_shell(&self, serial: &str, command: &str) -> ADBResult<ShellResult> {
        let use_v2 = self.shell_v2_supported()?;

        let mut transport = self.open_transport()?;
        transport.send_command(&format!("host:transport:{}", serial))?;
        match transport.read_okay() {
            Ok(()) => {}
            Err(ADBError::ProtocolFailure(msg)) => {
                return Err(ADBError::DeviceNotFound(format!("{}: {}", serial, msg)));
            }
            Err(e) => return Err(e),
        }

        debug!(
            "在设备 {} 上执行命令 (shell {}): {}",
            serial,
            if use_v2 { "v2" } else { "v1" },
            command
        );

        if use_v2 {
            transport.send_command(&format!("shell,v2,raw:{}", command))?;
            transport.read_okay()?;
            read_v2_stream(&mut transport)
        } else {
            transport.send_command(&format!("shell:{}", command))?;
            transport.read_okay()?;
            let stdout = transport.read_until_close()?;
            Ok(ShellResult {
                stdout,
                ..ShellResult::default()
            })
        }
    }
}

/// 解复用 shell v2 流: `[id: u8][len: u32 LE][payload]` 包序列
///
/// 包边界上的 EOF 结束流; 包中途的 EOF 视为响应被截断。
fn read_v2_stream(transport: &mut Transport) -> ADBResult<ShellResult> {
    let mut result = ShellResult::default();

    loop {
        let id = match transport.read_byte_or_eof()? {
            None => break,
            Some(id) => id,
        };

        let mut len_bytes = [0u8; 4];
        transport.read_exact_bytes(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; len];
        transport.read_exact_bytes(&mut payload)?;

        match id {
            ID_STDOUT => result.stdout.extend_from_slice(&payload),
            ID_STDERR => result.stderr.extend_from_slice(&payload),
            ID_EXIT => result.exit_code = payload.first().map(|&code| code as i32),
            other => trace!("忽略 shell v2 包 (id {}, {} 字节)", other, len),
        }
    }

    Ok(result)
}
