//! 集成测试公共设施：回环 TCP 模拟控制器

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use ur_sdk::protocol::{encode_frame, write_f64_array_be};
use ur_sdk::{RealtimeReceiver, ReceiverBuilder};

/// 默认布局下 tcp_pose 的偏移
pub const TCP_POSE_OFFSET: usize = 445;

/// 1064 字节的 type 16 帧，只填写 tcp_pose
pub fn tcp_pose_frame(pose: [f64; 6]) -> Vec<u8> {
    let mut payload = vec![0u8; 1060];
    payload[0] = 16;
    write_f64_array_be(&mut payload, TCP_POSE_OFFSET, &pose).unwrap();
    encode_frame(&payload)
}

/// type 20 安全帧
pub fn safety_frame(robot_mode: i32, safety_mode: i32, flags: u8, speed_scaling: f64) -> Vec<u8> {
    let mut payload = vec![0u8; 18];
    payload[0] = 20;
    payload[1..5].copy_from_slice(&robot_mode.to_be_bytes());
    payload[5..9].copy_from_slice(&safety_mode.to_be_bytes());
    payload[9] = flags;
    payload[10..18].copy_from_slice(&speed_scaling.to_be_bytes());
    encode_frame(&payload)
}

/// 模拟实时接口：接受一个连接，交给 `script` 处理
pub fn spawn_realtime_server<F>(script: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(stream);
    });
    (port, handle)
}

/// 模拟主接口：每收到一行回复一个 type 16 数据包，把行转发给测试
pub fn spawn_primary_server() -> (u16, crossbeam_channel::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let mut writer = stream.try_clone().unwrap();
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                let _ = tx.send(line);
                let mut payload = vec![0u8; 32];
                payload[0] = 16;
                if writer.write_all(&encode_frame(&payload)).is_err() {
                    break;
                }
            }
        }
    });
    (port, rx)
}

/// 模拟 Dashboard 服务
pub fn spawn_dashboard_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let mut writer = stream.try_clone().unwrap();
            if writer
                .write_all(b"Connected: Universal Robots Dashboard Server\n")
                .is_err()
            {
                continue;
            }
            for line in BufReader::new(stream).lines() {
                let Ok(line) = line else { break };
                let reply = match line.as_str() {
                    "robotmode" => "Robotmode: IDLE".to_string(),
                    "safetystatus" => "Safetystatus: NORMAL".to_string(),
                    "brake release" => "Brake releasing".to_string(),
                    "unlock protective stop" => "Protective stop releasing".to_string(),
                    other => format!("ok: {}", other),
                };
                if writer.write_all(format!("{}\n", reply).as_bytes()).is_err() {
                    break;
                }
            }
        }
    });
    port
}

/// 已关闭的本地端口（连接会被拒绝）
pub fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// 短超时的接收器
pub fn fast_receiver(port: u16) -> RealtimeReceiver {
    ReceiverBuilder::new("127.0.0.1")
        .port(port)
        .timeout(Duration::from_millis(100))
        .reconnect(3, Duration::from_millis(10))
        .join_timeout(Duration::from_secs(1))
        .build()
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}
