use fwforge::driver::{Driver, Suspender};
use fwforge::scenario::{Runner, ScanKind, Scenario};
use fwforge::structs::*;
use fwforge::transport::UdpTransport;

use rand_core::SeedableRng;
use rand_pcg::Pcg32;
use std::net::UdpSocket;
use std::time::Duration;

fn listener() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    socket
}

fn receive(socket: &UdpSocket, count: usize) -> Vec<String> {
    let mut buf = [0u8; 65536];
    (0..count)
        .map(|_| {
            let (len, _) = socket.recv_from(&mut buf).unwrap();
            String::from_utf8_lossy(&buf[..len]).into_owned()
        })
        .collect()
}

#[test]
fn batches_arrive_as_datagrams() {
    let socket = listener();
    let transport = UdpTransport::connect(socket.local_addr().unwrap()).unwrap();
    let mut driver = Driver::new(
        transport,
        Suspender::uncancellable(),
        Pcg32::seed_from_u64(0),
    );
    let lines: Vec<String> = (0..5).map(|i| format!("line {i}")).collect();
    let pacing = Pacing::new(2, Delay::Fixed(Duration::from_millis(1))).unwrap();
    let report = driver.drive(&lines, &pacing).unwrap();
    assert_eq!(report.datagrams, 3);
    assert_eq!(report.lines, 5);

    let received = receive(&socket, 3);
    assert_eq!(received, vec!["line 0\nline 1", "line 2\nline 3", "line 4"]);
}

#[test]
fn fast_scan_over_loopback() {
    let socket = listener();
    let transport = UdpTransport::connect(socket.local_addr().unwrap()).unwrap();
    let mut runner = Runner::new(
        transport,
        Suspender::uncancellable(),
        Some(1),
        CefEnvelope::Bare,
    );
    let scenario = Scenario::Scan {
        kind: ScanKind::Fast,
        ports: 20,
        format: LogFormat::Cef,
        sources: vec!["10.9.8.7".parse().unwrap()],
        pacing: Pacing::new(4, Delay::Fixed(Duration::ZERO)).unwrap(),
    };
    let reports = runner.run(&scenario).unwrap();
    assert!(matches!(&reports[0].outcome, Outcome::Completed(r) if r.datagrams == 5));

    let lines: Vec<String> = receive(&socket, 5)
        .iter()
        .flat_map(|d| d.split('\n').map(str::to_string))
        .collect();
    assert_eq!(lines.len(), 20);
    assert!(lines.iter().all(|l| l.contains("src=10.9.8.7 ")));
}
