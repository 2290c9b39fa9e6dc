//! Fluxo completo: fonte TCP → pipeline → assinantes WebSocket.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};
use telemetry_core::config::AppConfig;
use telemetry_core::{OutboundEvent, decode_event};
use telemetry_streamer::Streamer;
use tungstenite::WebSocket;

type Client = WebSocket<TcpStream>;

fn start() -> (SocketAddr, SocketAddr) {
    start_with(|_| {})
}

fn start_with(tweak: impl FnOnce(&mut AppConfig)) -> (SocketAddr, SocketAddr) {
    let mut config = AppConfig::default();
    config.ingest.bind_ip = "127.0.0.1".into();
    config.ingest.port = 0;
    config.publish.bind_ip = "127.0.0.1".into();
    config.publish.port = 0;
    config.pipeline.heartbeat_interval_ms = 100;
    tweak(&mut config);

    let streamer = Streamer::bind(config).unwrap();
    let ingest = streamer.ingest_addr().unwrap();
    let publish = streamer.publish_addr().unwrap();
    streamer.spawn().unwrap();
    (ingest, publish)
}

fn subscribe(addr: SocketAddr) -> Client {
    let stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let (mut client, _) = tungstenite::client(format!("ws://{addr}/"), stream).unwrap();
    // O primeiro heartbeat confirma que o assinante já está no hub
    next_matching(&mut client, |e| matches!(e, OutboundEvent::Heartbeat { .. }));
    client
}

fn next_text(client: &mut Client) -> String {
    loop {
        let msg = client.read().unwrap();
        if msg.is_text() {
            return msg.to_text().unwrap().to_owned();
        }
    }
}

fn next_matching(client: &mut Client, pred: impl Fn(&OutboundEvent) -> bool) -> OutboundEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let event = decode_event(&next_text(client)).unwrap();
        if pred(&event) {
            return event;
        }
    }
    panic!("evento esperado não chegou");
}

/// Próximo evento que não seja heartbeat.
fn next_event(client: &mut Client) -> OutboundEvent {
    next_matching(client, |e| !matches!(e, OutboundEvent::Heartbeat { .. }))
}

#[test]
fn source_records_reach_subscriber_in_order() {
    let (ingest, publish) = start();
    let mut client = subscribe(publish);

    let mut source = TcpStream::connect(ingest).unwrap();
    assert!(matches!(
        next_event(&mut client),
        OutboundEvent::Status {
            source_connected: true,
            ..
        }
    ));

    // Registro partido entre escritas, lixo e linha vazia no meio
    source.write_all(br#"{"battery_temperature": 37"#).unwrap();
    source.flush().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    source
        .write_all(
            b".5, \"timestamp\": 1000}\n{\"temp\": \"abc\"}\n\n{\"temp\": 30, \"ts\": 2000}\n{\"value\": \"40\", \"ts\": 3000}\n",
        )
        .unwrap();

    assert_eq!(
        next_event(&mut client),
        OutboundEvent::Data {
            battery_temperature: 37.5,
            timestamp: 1000
        }
    );
    assert_eq!(
        next_event(&mut client),
        OutboundEvent::Data {
            battery_temperature: 30.0,
            timestamp: 2000
        }
    );
    match next_event(&mut client) {
        OutboundEvent::Alert { ts, message } => {
            assert_eq!(ts, 3000);
            assert!(message.contains("latest=40.000°C"), "{message}");
        }
        other => panic!("esperava alerta, veio {other:?}"),
    }
    assert_eq!(
        next_event(&mut client),
        OutboundEvent::Data {
            battery_temperature: 40.0,
            timestamp: 3000
        }
    );

    drop(source);
    assert!(matches!(
        next_event(&mut client),
        OutboundEvent::Status {
            source_connected: false,
            ..
        }
    ));

    let hb = next_matching(&mut client, |e| matches!(e, OutboundEvent::Heartbeat { .. }));
    assert!(matches!(
        hb,
        OutboundEvent::Heartbeat {
            source_connected: false,
            ..
        }
    ));
}

#[test]
fn every_subscriber_receives_identical_payload() {
    let (ingest, publish) = start();
    let mut clients: Vec<Client> = (0..3).map(|_| subscribe(publish)).collect();

    let mut source = TcpStream::connect(ingest).unwrap();
    source
        .write_all(b"{\"battery_temperature\": 35.5, \"timestamp\": 42}\n")
        .unwrap();

    let expected = r#"{"type":"data","battery_temperature":35.5,"timestamp":42}"#;
    for client in &mut clients {
        let text = loop {
            let text = next_text(client);
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            if value["type"] == "data" {
                break text;
            }
        };
        assert_eq!(text, expected);
    }
}

#[test]
fn heartbeat_reports_connected_source() {
    let (ingest, publish) = start();
    let mut client = subscribe(publish);

    let _source = TcpStream::connect(ingest).unwrap();
    next_matching(&mut client, |e| {
        matches!(
            e,
            OutboundEvent::Status {
                source_connected: true,
                ..
            }
        )
    });
    next_matching(&mut client, |e| {
        matches!(
            e,
            OutboundEvent::Heartbeat {
                source_connected: true,
                ..
            }
        )
    });
}

#[test]
fn oversized_record_closes_source_and_reports_disconnect() {
    let (ingest, publish) = start_with(|c| c.ingest.max_record_bytes = 16);
    let mut client = subscribe(publish);

    let mut source = TcpStream::connect(ingest).unwrap();
    source
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    next_matching(&mut client, |e| {
        matches!(
            e,
            OutboundEvent::Status {
                source_connected: true,
                ..
            }
        )
    });

    source
        .write_all(b"{\"battery_temperature\": 35.5000000000000000}")
        .unwrap();

    assert!(matches!(
        next_event(&mut client),
        OutboundEvent::Status {
            source_connected: false,
            ..
        }
    ));

    // O servidor fechou o socket: EOF ou reset, nunca timeout
    let mut buf = [0u8; 16];
    match source.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert!(
            !matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            "{e}"
        ),
    }
}
