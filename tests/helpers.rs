// Shared test helpers: an in-process mock DNS server answering from a
// static zone, so end-to-end tests never touch the real network.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::{rdata, Name, RData, Record, RecordType};
use tokio::net::UdpSocket;

/// Static zone: (lowercase name, record type) → answer rdata list.
#[derive(Default)]
pub struct MockZone {
    answers: HashMap<(String, RecordType), Vec<RData>>,
}

impl MockZone {
    #[allow(dead_code)] // Used by other test files
    pub fn answer(mut self, name: &str, record_type: RecordType, data: RData) -> Self {
        self.answers
            .entry((name.to_string(), record_type))
            .or_default()
            .push(data);
        self
    }
}

#[allow(dead_code)] // Used by other test files
pub fn cname(target: &str) -> RData {
    RData::CNAME(rdata::CNAME(Name::from_str(target).unwrap()))
}

#[allow(dead_code)] // Used by other test files
pub fn a(addr: Ipv4Addr) -> RData {
    RData::A(rdata::A(addr))
}

/// Starts the mock server on an ephemeral loopback port and returns its
/// address. Unknown queries get an empty NoError response, like a real
/// resolver answering for a name with no records of that type.
#[allow(dead_code)] // Used by other test files
pub async fn start_mock_server(zone: MockZone) -> String {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind mock");
    let addr = socket.local_addr().expect("local addr");

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let Ok(request) = Message::from_vec(&buf[..len]) else {
                continue;
            };
            let Some(query) = request.queries().first().cloned() else {
                continue;
            };

            let key = (
                query.name().to_utf8().trim_end_matches('.').to_lowercase(),
                query.query_type(),
            );

            let mut response = Message::new();
            response
                .set_id(request.id())
                .set_message_type(MessageType::Response)
                .set_response_code(ResponseCode::NoError)
                .add_query(query.clone());

            if let Some(answers) = zone.answers.get(&key) {
                for data in answers {
                    response.add_answer(Record::from_rdata(query.name().clone(), 60, data.clone()));
                }
            }

            if let Ok(bytes) = response.to_vec() {
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });

    addr.to_string()
}

/// Binds a UDP socket that never answers, for timeout scenarios. Returns
/// the address and the socket (kept alive by the caller).
#[allow(dead_code)] // Used by other test files
pub async fn silent_server() -> (String, UdpSocket) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind silent");
    let addr = socket.local_addr().expect("local addr").to_string();
    (addr, socket)
}
