use adb_host::prelude::*;

fn main() -> ADBResult<()> {
    let adb = ADB::new(Some(
        ADBConfigBuilder::default()
            .server_path("adb")
            .start_timeout(5000)
            .build(),
    ));

    // 查询当前状态
    let status = adb.get_status()?;
    if status.running {
        println!("服务器已在运行, 版本: {:?}", status.version);
    } else {
        println!("服务器未运行");
    }

    // 启动（或确认已启动）
    let status = adb.start_server(false)?;
    println!("启动后状态: running={}, 版本={:?}", status.running, status.version);

    // 再次调用验证幂等性: 不会拉起第二个子进程
    let again = adb.start_server(false)?;
    assert_eq!(status, again);

    // 停止服务器; 连接被拒绝视为已经停止
    adb.kill_server()?;
    let status = adb.get_status()?;
    println!("停止后状态: running={}", status.running);

    Ok(())
}
