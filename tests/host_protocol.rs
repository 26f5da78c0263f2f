//! 端到端测试: 真实的 ADB 客户端对着进程内的 stub 服务器走完整 host 协议。

use adb_host::prelude::*;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

/// 读取一条长度前缀请求；对端关闭时返回 None
fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut digits = [0u8; 4];
    match socket.read_exact(&mut digits) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return None,
        Err(e) => panic!("stub 读取请求失败: {}", e),
    }

    let len = usize::from_str_radix(std::str::from_utf8(&digits).unwrap(), 16).unwrap();
    let mut command = vec![0u8; len];
    socket.read_exact(&mut command).unwrap();
    Some(String::from_utf8(command).unwrap())
}

fn write_okay_payload(socket: &mut TcpStream, payload: &str) {
    socket.write_all(b"OKAY").unwrap();
    socket
        .write_all(format!("{:04x}", payload.len()).as_bytes())
        .unwrap();
    socket.write_all(payload.as_bytes()).unwrap();
}

fn write_fail(socket: &mut TcpStream, message: &str) {
    socket.write_all(b"FAIL").unwrap();
    socket
        .write_all(format!("{:04x}", message.len()).as_bytes())
        .unwrap();
    socket.write_all(message.as_bytes()).unwrap();
}

fn v2_packet(id: u8, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![id];
    packet.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    packet.extend_from_slice(payload);
    packet
}

fn v2_shell_response(stdout: &[u8], stderr: &[u8], exit_code: u8) -> Vec<u8> {
    let mut response = b"OKAY".to_vec();
    if !stdout.is_empty() {
        response.extend(v2_packet(1, stdout));
    }
    if !stderr.is_empty() {
        response.extend(v2_packet(2, stderr));
    }
    response.extend(v2_packet(3, &[exit_code]));
    response
}

/// stub 服务器: 处理 `connections` 个连接，每个连接内按命令分发响应。
/// 一个连接上可以出现多条命令（transport 绑定后跟 shell 命令）。
fn spawn_stub<F>(connections: usize, handler: F) -> (u16, thread::JoinHandle<()>)
where
    F: Fn(&str, &mut TcpStream) -> bool + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        for _ in 0..connections {
            let (mut socket, _) = listener.accept().unwrap();
            while let Some(command) = read_request(&mut socket) {
                if !handler(&command, &mut socket) {
                    break;
                }
            }
        }
    });

    (port, handle)
}

fn client_for_port(port: u16) -> ADB {
    ADB::new(Some(
        ADBConfigBuilder::default()
            .port(port)
            .connect_timeout(1000)
            .read_timeout(1000)
            .server_path("/nonexistent/adb-binary")
            .build(),
    ))
}

/// 常见命令的默认分发; 返回 false 表示该连接不再有后续命令
fn default_dispatch(command: &str, socket: &mut TcpStream) -> bool {
    match command {
        "host:version" => {
            write_okay_payload(socket, "0029");
            false
        }
        "host:features" => {
            write_okay_payload(socket, "shell_v2,cmd,stat_v2");
            false
        }
        "host:kill" => {
            socket.write_all(b"OKAY").unwrap();
            false
        }
        cmd if cmd.starts_with("host:transport:") => {
            socket.write_all(b"OKAY").unwrap();
            true
        }
        other => panic!("stub 收到未预期的命令: {:?}", other),
    }
}

#[test]
fn list_devices_preserves_serials_and_maps_states() {
    let payload = "\
emulator-5554          device product:sdk_gphone64 model:Pixel_6 transport_id:1
abc123                 unauthorized transport_id:2
weird-one              hibernating
";
    let (port, handle) = spawn_stub(1, move |command, socket| {
        assert_eq!(command, "host:devices-l");
        write_okay_payload(socket, payload);
        false
    });

    let adb = client_for_port(port);
    let devices = adb.list_devices().unwrap();

    assert_eq!(devices.len(), 3);
    assert_eq!(devices[0].serial, "emulator-5554");
    assert_eq!(devices[0].status, DeviceStatus::Online);
    assert_eq!(devices[0].transport_id, Some(1));
    assert_eq!(devices[1].status, DeviceStatus::Unauthorized);
    assert_eq!(
        devices[2].status,
        DeviceStatus::Other("hibernating".to_string())
    );
    handle.join().unwrap();
}

#[test]
fn list_devices_with_empty_payload_is_empty_not_an_error() {
    let (port, handle) = spawn_stub(1, |command, socket| {
        assert_eq!(command, "host:devices-l");
        write_okay_payload(socket, "");
        false
    });

    let devices = client_for_port(port).list_devices().unwrap();
    assert!(devices.is_empty());
    handle.join().unwrap();
}

#[test]
fn server_status_round_trip_with_kill() {
    // 连接 1: host:version, 连接 2: host:kill
    let (port, handle) = spawn_stub(2, default_dispatch);
    let adb = client_for_port(port);

    let status = adb.get_status().unwrap();
    assert!(status.running);
    assert_eq!(status.version, Some(0x29));

    adb.kill_server().unwrap();
    handle.join().unwrap();
}

#[test]
fn list_packages_end_to_end_over_shell_v2() {
    let shell_output = "\
package:/data/app/com.foo-1/base.apk=com.foo
garbage line
package:/system/app/Settings/Settings.apk=com.android.settings
";
    // 连接 1: host:features 探测, 连接 2: transport 绑定 + shell 命令
    let (port, handle) = spawn_stub(2, move |command, socket| match command {
        "shell,v2,raw:pm list packages -f" => {
            let response = v2_shell_response(shell_output.as_bytes(), b"", 0);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    let packages = adb.list_packages("emulator-5554").unwrap();

    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0].name, "com.foo");
    assert_eq!(
        packages[0].install_path.as_deref(),
        Some("/data/app/com.foo-1/base.apk")
    );
    assert_eq!(packages[1].name, "com.android.settings");
    handle.join().unwrap();
}

#[test]
fn list_packages_surfaces_nonzero_exit_as_command_failed() {
    let (port, handle) = spawn_stub(2, |command, socket| match command {
        cmd if cmd.starts_with("shell,v2,raw:pm") => {
            let response = v2_shell_response(b"", b"pm: not found", 127);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    match adb.list_packages("emulator-5554") {
        Err(ADBError::CommandFailed { code, stderr }) => {
            assert_eq!(code, 127);
            assert!(stderr.contains("pm: not found"));
        }
        other => panic!("期望 CommandFailed, 实际 {:?}", other),
    }
    handle.join().unwrap();
}

#[test]
fn list_processes_end_to_end_over_shell_v2() {
    let ps_output = "\
USER           PID  PPID     VSZ    RSS WCHAN            ADDR S NAME
root             1     0 2340304   4584 0                   0 S init
u0_a118        123     1 1404304  84584 0                   0 S com.bar
short row
";
    let (port, handle) = spawn_stub(2, move |command, socket| match command {
        "shell,v2,raw:ps -A" => {
            let response = v2_shell_response(ps_output.as_bytes(), b"", 0);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    let processes = adb.list_processes("emulator-5554").unwrap();

    assert_eq!(processes.len(), 2);
    assert_eq!(processes[1].pid, 123);
    assert_eq!(processes[1].name, "com.bar");
    assert_eq!(processes[1].ppid, Some(1));
    assert_eq!(processes[1].user.as_deref(), Some("u0_a118"));
    handle.join().unwrap();
}

#[test]
fn list_package_names_without_paths() {
    let (port, handle) = spawn_stub(2, |command, socket| match command {
        "shell,v2,raw:pm list packages" => {
            let response = v2_shell_response(b"package:com.foo\npackage:com.bar\n", b"", 0);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    let names = adb.list_package_names("emulator-5554").unwrap();
    assert_eq!(names, vec!["com.foo".to_string(), "com.bar".to_string()]);
    handle.join().unwrap();
}

#[test]
fn parallel_shell_fans_out_one_connection_per_device() {
    // 1 次探测 + 1 次预热 shell + 2 次并行 shell = 4 个连接
    let (port, handle) = spawn_stub(4, |command, socket| match command {
        cmd if cmd.starts_with("shell,v2,raw:echo") => {
            let response = v2_shell_response(b"ok\n", b"", 0);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    // 预热能力探测, 让扇出阶段的连接数确定
    adb.run_shell("device-a", "echo warm").unwrap();

    let results = adb.parallel_shell(&["device-a", "device-b"], "echo hi");
    assert_eq!(results.len(), 2);
    for result in results.values() {
        let shell = result.as_ref().unwrap();
        assert_eq!(shell.stdout, b"ok\n");
        assert!(shell.success());
    }
    handle.join().unwrap();
}

#[test]
fn shell_falls_back_to_v1_when_server_lacks_features() {
    // 旧服务器: host:features 被拒绝, 客户端应换用 shell: 通道
    let (port, handle) = spawn_stub(2, |command, socket| match command {
        "host:features" => {
            write_fail(socket, "unknown host service");
            false
        }
        "shell:getprop ro.build.version.release" => {
            socket.write_all(b"OKAY14\n").unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    let result = adb
        .run_shell("emulator-5554", "getprop ro.build.version.release")
        .unwrap();

    assert_eq!(result.stdout, b"14\n");
    assert_eq!(result.exit_code, None);
    handle.join().unwrap();
}

#[test]
fn shell_v2_probe_is_cached_per_client() {
    // 3 个连接: 1 次 features 探测 + 2 次 shell 会话; 第二次 run_shell 不再探测
    let (port, handle) = spawn_stub(3, |command, socket| match command {
        cmd if cmd.starts_with("shell,v2,raw:echo") => {
            let response = v2_shell_response(b"hi\n", b"", 0);
            socket.write_all(&response).unwrap();
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    for _ in 0..2 {
        let result = adb.run_shell("emulator-5554", "echo hi").unwrap();
        assert_eq!(result.stdout, b"hi\n");
        assert_eq!(result.exit_code, Some(0));
    }
    handle.join().unwrap();
}

#[test]
fn run_shell_against_detached_device_reports_device_not_found() {
    let (port, handle) = spawn_stub(2, |command, socket| match command {
        cmd if cmd.starts_with("host:transport:") => {
            write_fail(socket, "device 'gone' not found");
            false
        }
        other => default_dispatch(other, socket),
    });

    let adb = client_for_port(port);
    assert!(matches!(
        adb.run_shell("gone", "id"),
        Err(ADBError::DeviceNotFound(_))
    ));
    handle.join().unwrap();
}
