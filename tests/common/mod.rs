#![allow(dead_code)]

use std::io::Read;
use std::net::{SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use quorumcast::config::{Config, Tuning};
use quorumcast::server::Server;
use quorumcast::shutdown::ShutdownSummary;

pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected loopback pair: the blocking client end and the
/// non-blocking server end, plus the client's address as the server sees it.
pub struct Pair {
    pub client: TcpStream,
    pub server: mio::net::TcpStream,
    pub peer: SocketAddrV4,
}

pub fn loopback_listener() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").unwrap()
}

pub fn pair(listener: &TcpListener) -> Pair {
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    client.set_read_timeout(Some(READ_TIMEOUT)).unwrap();

    let (accepted, peer) = listener.accept().unwrap();
    accepted.set_nonblocking(true).unwrap();

    let SocketAddr::V4(peer) = peer else {
        panic!("loopback peer is not IPv4");
    };

    Pair {
        client,
        server: mio::net::TcpStream::from_std(accepted),
        peer,
    }
}

pub fn test_config(expected_clients: usize, tuning: Tuning) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        expected_clients,
        tuning,
    }
}

/// Binds a server on an ephemeral port and runs it on a background thread.
pub fn spawn_server(cfg: Config) -> (SocketAddr, JoinHandle<anyhow::Result<ShutdownSummary>>) {
    let server = Server::bind(&cfg).unwrap();
    let addr = server.local_addr();
    let handle = thread::spawn(move || server.run());
    (addr, handle)
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(READ_TIMEOUT)).unwrap();
    stream
}

/// Gives the server loop a moment to accept freshly connected clients.
pub fn settle() {
    thread::sleep(Duration::from_millis(150));
}

pub fn read_n(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).unwrap();
    buf
}

/// True once the server has closed the stream (EOF or reset, not a timeout).
pub fn is_closed(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 64];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(e) => {
                return !matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                );
            }
        }
    }
}

pub fn local_v4(stream: &TcpStream) -> SocketAddrV4 {
    match stream.local_addr().unwrap() {
        SocketAddr::V4(v4) => v4,
        other => panic!("unexpected local address {other}"),
    }
}
