//! Prints the wire encoding of each packet in the status flow, for
//! cross-checking against other protocol implementations.
//!
//! Run with: `cargo run --example wire_dump`

use protocol::packet::{handshake, ping, status_request, status_response, Packet};
use protocol::status::StatusResponse;

fn dump(label: &str, bytes: &[u8]) {
    print!("{label:<16} ({:>3} bytes):", bytes.len());
    for byte in bytes {
        print!(" {byte:02x}");
    }
    println!();
}

fn main() {
    println!("=== Status flow packets for localhost:25565 ===\n");

    dump("handshake", &handshake("localhost", 25565).encode());
    dump("status request", &status_request().encode());
    dump("ping(1)", &ping(1).encode());

    let json = r#"{"version":{"name":"1.21","protocol":767},"players":{"online":3,"max":20},"description":"§aA Deckhand server"}"#;
    let response = status_response(json).encode();
    dump("status response", &response);

    println!("\n=== Decoding the response back ===\n");

    let (packet, consumed) = Packet::decode(&response)
        .expect("well-formed packet")
        .expect("complete packet");
    println!("id: {:#04x}, consumed: {consumed} bytes", packet.id);

    let document = protocol::packet::parse_status_payload(&packet.payload)
        .expect("valid string payload");
    let status = StatusResponse::from_json(&document).expect("valid status JSON");
    println!(
        "version: {}, players: {}/{}, motd: {:?}",
        status.version.name,
        status.players.online,
        status.players.max,
        status.motd()
    );
}
