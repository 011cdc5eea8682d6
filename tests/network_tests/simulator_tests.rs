//! Simulator Tests
//!
//! Drives the controller simulator with raw sockets.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::{Duration, Instant};

use rackwire::network::{Behavior, Simulator, SimulatorHandle};
use rackwire::protocol::{decode_words, encode_command, CommandFrame, Field, FieldLayout};
use rackwire::RackError;

// =============================================================================
// Helper Functions
// =============================================================================

fn start(layout: FieldLayout) -> SimulatorHandle {
    Simulator::bind("127.0.0.1:0", layout).unwrap().spawn().unwrap()
}

fn client(simulator: &SimulatorHandle) -> TcpStream {
    let stream = TcpStream::connect(simulator.addr()).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    stream
}

fn roundtrip(stream: &mut TcpStream, param1: u16, param2: u16) -> [u16; 10] {
    stream.write_all(&encode_command(param1, param2)).unwrap();
    let mut frame = [0u8; 20];
    stream.read_exact(&mut frame).unwrap();
    decode_words(&frame).unwrap()
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_status_request_returns_words() {
    let simulator = start(FieldLayout::stow());
    simulator.set_words([1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

    let mut stream = client(&simulator);
    assert_eq!(roundtrip(&mut stream, 0, 2), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    assert_eq!(simulator.commands(), vec![CommandFrame::status_request()]);
}

#[test]
fn test_open_aisle_is_recorded() {
    let simulator = start(FieldLayout::stow());
    let mut stream = client(&simulator);

    roundtrip(&mut stream, 7, 1);
    assert_eq!(simulator.last_opened_aisle(), Some(7));

    roundtrip(&mut stream, 0, 2);
    assert_eq!(simulator.last_opened_aisle(), Some(7));
}

#[test]
fn test_unknown_command_still_answered() {
    let simulator = start(FieldLayout::stow());
    let mut stream = client(&simulator);

    roundtrip(&mut stream, 42, 9);
    assert_eq!(simulator.last_opened_aisle(), None);
    assert_eq!(simulator.commands(), vec![CommandFrame::new(42, 9)]);
}

#[test]
fn test_set_field_follows_layout() {
    let simulator = start(FieldLayout::wms());
    simulator.set_field(Field::MobileQuantity, 12).unwrap();
    simulator.set_field(Field::Position2, 250).unwrap();

    let words = simulator.words();
    assert_eq!(words[5], 12);
    assert_eq!(words[7], 250);

    assert!(matches!(
        simulator.set_field(Field::ReadyToOperate, 1),
        Err(RackError::Config(_))
    ));
}

#[test]
fn test_each_connection_served() {
    let simulator = start(FieldLayout::stow());
    let mut a = client(&simulator);
    let mut b = client(&simulator);

    roundtrip(&mut a, 0, 2);
    roundtrip(&mut b, 3, 1);
    roundtrip(&mut a, 0, 2);

    assert_eq!(simulator.accepted(), 2);
    assert_eq!(simulator.commands().len(), 3);
}

#[test]
fn test_finished_connections_are_released() {
    let simulator = start(FieldLayout::stow());

    for _ in 0..20 {
        let mut stream = client(&simulator);
        roundtrip(&mut stream, 0, 2);
    }
    assert_eq!(simulator.accepted(), 20);

    let deadline = Instant::now() + Duration::from_secs(5);
    while simulator.open_connections() > 0 {
        assert!(Instant::now() < deadline, "connections never released");
        thread::sleep(Duration::from_millis(5));
    }

    // A live connection is still tracked
    let mut stream = client(&simulator);
    roundtrip(&mut stream, 0, 2);
    assert_eq!(simulator.open_connections(), 1);
}

#[test]
fn test_accept_loop_survives_clients_that_vanish() {
    let simulator = start(FieldLayout::stow());

    for _ in 0..20 {
        drop(TcpStream::connect(simulator.addr()).unwrap());
    }

    let mut stream = client(&simulator);
    assert_eq!(roundtrip(&mut stream, 0, 2), [0u16; 10]);
}

// =============================================================================
// Behavior Tests
// =============================================================================

#[test]
fn test_truncate_closes_after_partial_frame() {
    let simulator = start(FieldLayout::stow());
    simulator.set_behavior(Behavior::Truncate(12));

    let mut stream = client(&simulator);
    stream.write_all(&encode_command(0, 2)).unwrap();

    let mut received = Vec::new();
    stream.read_to_end(&mut received).unwrap();
    assert_eq!(received.len(), 12);
}

#[test]
fn test_delay_postpones_answer() {
    let simulator = start(FieldLayout::stow());
    simulator.set_behavior(Behavior::Delay(Duration::from_millis(150)));

    let mut stream = client(&simulator);
    let started = Instant::now();
    roundtrip(&mut stream, 0, 2);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[test]
fn test_silent_never_answers() {
    let simulator = start(FieldLayout::stow());
    simulator.set_behavior(Behavior::Silent);

    let mut stream = client(&simulator);
    stream
        .set_read_timeout(Some(Duration::from_millis(150)))
        .unwrap();
    stream.write_all(&encode_command(0, 2)).unwrap();

    let mut byte = [0u8; 1];
    let err = stream.read(&mut byte).unwrap_err();
    assert!(matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    ));
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_shutdown_closes_connections() {
    let mut simulator = start(FieldLayout::stow());
    let mut stream = client(&simulator);
    roundtrip(&mut stream, 0, 2);

    simulator.shutdown();

    let mut byte = [0u8; 1];
    assert_eq!(stream.read(&mut byte).unwrap(), 0);
}
