use crate::device::ADB;
use crate::error::{ADBError, ADBResult};
use log::{debug, info, trace};

/// 进程信息结构体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
    pub ppid: Option<i32>,
    pub user: Option<String>,
}

// ps 表头中可能代表进程名的列
const NAME_COLUMNS: [&str; 4] = ["NAME", "CMD", "COMM", "COMMAND"];

impl ADB {
    /// 列出设备上的进程
    ///
    /// 优先 `ps -A`；旧版 toolbox ps 不认识 -A 时回退到 `ps`。
    /// 表头用于确定列顺序（不同平台版本会重排列），字段数少于表头
    /// 或 PID 字段不是数字的行被跳过而不是中止整个枚举。
    pub fn list_processes(&self, serial: &str) -> ADBResult<Vec<ProcessInfo>> {
        let primary = self.run_shell(serial, "ps -A")?;
        let output = if primary.success() && has_pid_header(&primary.stdout_lossy()) {
            primary
        } else {
            debug!("设备 {} 上 ps -A 不可用, 回退到 ps", serial);
            self.run_shell(serial, "ps")?.into_checked()?
        };

        let processes = parse_ps_output(&output.stdout_lossy())?;
        info!("设备 {} 上发现 {} 个进程", serial, processes.len());
        Ok(processes)
    }
}

fn has_pid_header(output: &str) -> bool {
    output
        .lines()
        .next()
        .map(|header| header.split_whitespace().any(|col| col.eq_ignore_ascii_case("PID")))
        .unwrap_or(false)
}

/// 按表头确定的列顺序解析 ps 输出
fn parse_ps_output(output: &str) -> ADBResult<Vec<ProcessInfo>> {
    let mut lines = output.lines();
    let header = lines
        .next()
        .ok_or_else(|| ADBError::ParseError("ps 输出为空".to_string()))?;

    let columns: Vec<String> = header
        .split_whitespace()
        .map(|col| col.to_uppercase())
        .collect();

    let pid_idx = columns
        .iter()
        .position(|col| col == "PID")
        .ok_or_else(|| ADBError::ParseError(format!("ps 表头缺少 PID 列: {:?}", header)))?;
    let ppid_idx = columns.iter().position(|col| col == "PPID");
    let user_idx = columns.iter().position(|col| col == "USER" || col == "UID");
    let name_idx = columns
        .iter()
        .position(|col| NAME_COLUMNS.contains(&col.as_str()))
        .unwrap_or(columns.len() - 1);

    let mut processes = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < columns.len() {
            trace!("跳过字段数不足的进程行: {:?}", line);
            continue;
        }

        let pid: i32 = match fields[pid_idx].parse() {
            Ok(pid) => pid,
            Err(_) => {
                trace!("跳过 PID 非数字的进程行: {:?}", line);
                continue;
            }
        };

        // 名字列是最后一列时把剩余字段并回去，内核线程名可能带空格
        let name = if name_idx == columns.len() - 1 {
            fields[name_idx..].join(" ")
        } else {
            fields[name_idx].to_string()
        };

        processes.push(ProcessInfo {
            pid,
            name,
            ppid: ppid_idx.and_then(|idx| fields[idx].parse().ok()),
            user: user_idx.map(|idx| fields[idx].to_string()),
        });
    }

    Ok(processes)
}
