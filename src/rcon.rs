use std::cell::RefCell;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::rc::Rc;
use std::time::Duration;

use crate::error::RconError;

const PACKET_TYPE_RESPONSE_VALUE: i32 = 0;
const PACKET_TYPE_EXEC_COMMAND: i32 = 2;
const PACKET_TYPE_AUTH_RESPONSE: i32 = 2;
const PACKET_TYPE_AUTH: i32 = 3;
const MIN_PACKET_SIZE: i32 = 10;
const MAX_PACKET_SIZE: i32 = 1 << 20;
const MAX_PACKETS_PER_REPLY: usize = 32;

/// Request/response channel to the game server console.
pub trait RemoteControl {
    fn execute(&mut self, command: &str) -> Result<String, RconError>;
}

/// Player-facing chat output. Fire-and-forget: implementations log failures.
pub trait MessageSink {
    fn send(&mut self, text: &str);
}

/// Chat text is wrapped in double quotes by `say`, so inner quotes are neutralised.
pub fn say_command(text: &str) -> String {
    format!("say \"{}\"", text.replace('"', "'"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RconPacket {
    pub(crate) id: i32,
    pub(crate) packet_type: i32,
    pub(crate) body: String,
}

pub(crate) fn encode_packet(packet: &RconPacket) -> Vec<u8> {
    let body = packet.body.as_bytes();
    let size = (body.len() + MIN_PACKET_SIZE as usize) as i32;
    let mut bytes = Vec::with_capacity(body.len() + 14);
    bytes.extend_from_slice(&size.to_le_bytes());
    bytes.extend_from_slice(&packet.id.to_le_bytes());
    bytes.extend_from_slice(&packet.packet_type.to_le_bytes());
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

pub(crate) fn read_packet(reader: &mut impl Read) -> Result<RconPacket, RconError> {
    let size = read_i32(reader)?;
    if !(MIN_PACKET_SIZE..=MAX_PACKET_SIZE).contains(&size) {
        return Err(RconError::MalformedPacket {
            reason: format!("packet size {size} out of range"),
        });
    }

    let id = read_i32(reader)?;
    let packet_type = read_i32(reader)?;
    let mut payload = vec![0_u8; size as usize - 8];
    reader.read_exact(&mut payload)?;

    let body_end = payload
        .iter()
        .position(|byte| *byte == 0)
        .unwrap_or(payload.len());
    let body = String::from_utf8_lossy(&payload[..body_end]).into_owned();

    Ok(RconPacket {
        id,
        packet_type,
        body,
    })
}

fn read_i32(reader: &mut impl Read) -> Result<i32, RconError> {
    let mut buffer = [0_u8; 4];
    reader.read_exact(&mut buffer)?;
    Ok(i32::from_le_bytes(buffer))
}

/// Source RCON client. Connects lazily and drops the connection after any
/// failure so the next call starts from a fresh, authenticated socket.
pub struct RconClient {
    address: String,
    password: String,
    timeout: Duration,
    connection: Option<TcpStream>,
    next_request_id: i32,
}

impl RconClient {
    pub fn new(address: String, password: String, timeout: Duration) -> Self {
        Self {
            address,
            password,
            timeout,
            connection: None,
            next_request_id: 1,
        }
    }

    fn allocate_request_id(&mut self) -> i32 {
        let request_id = self.next_request_id;
        self.next_request_id = if self.next_request_id >= i32::MAX - 1 {
            1
        } else {
            self.next_request_id + 1
        };
        request_id
    }

    fn connect(&mut self) -> Result<TcpStream, RconError> {
        let socket_address = self
            .address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RconError::MalformedPacket {
                reason: format!("address '{}' did not resolve", self.address),
            })?;

        let mut stream = TcpStream::connect_timeout(&socket_address, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let auth_id = self.allocate_request_id();
        stream.write_all(&encode_packet(&RconPacket {
            id: auth_id,
            packet_type: PACKET_TYPE_AUTH,
            body: self.password.clone(),
        }))?;

        for _ in 0..MAX_PACKETS_PER_REPLY {
            let packet = read_packet(&mut stream)?;
            if packet.packet_type != PACKET_TYPE_AUTH_RESPONSE {
                continue;
            }
            if packet.id == -1 || packet.id != auth_id {
                return Err(RconError::AuthRejected {
                    address: self.address.clone(),
                });
            }
            tracing::debug!(address = %self.address, "RCON connection authenticated");
            return Ok(stream);
        }

        Err(RconError::MalformedPacket {
            reason: "no auth response received".to_string(),
        })
    }

    fn exchange(&mut self, command: &str) -> Result<String, RconError> {
        if self.connection.is_none() {
            self.connection = Some(self.connect()?);
        }

        let request_id = self.allocate_request_id();
        let Some(stream) = self.connection.as_mut() else {
            return Err(RconError::MalformedPacket {
                reason: "connection unavailable".to_string(),
            });
        };

        stream.write_all(&encode_packet(&RconPacket {
            id: request_id,
            packet_type: PACKET_TYPE_EXEC_COMMAND,
            body: command.to_string(),
        }))?;

        for _ in 0..MAX_PACKETS_PER_REPLY {
            let packet = read_packet(stream)?;
            if packet.id == request_id && packet.packet_type == PACKET_TYPE_RESPONSE_VALUE {
                return Ok(packet.body);
            }
        }

        Err(RconError::MalformedPacket {
            reason: format!("no response for request {request_id}"),
        })
    }
}

impl RemoteControl for RconClient {
    fn execute(&mut self, command: &str) -> Result<String, RconError> {
        tracing::debug!(command, "RCON");
        let result = self.exchange(command);
        if result.is_err() {
            self.connection = None;
        }
        result
    }
}

/// One RCON connection shared by the controller's remote-control and chat roles.
#[derive(Clone)]
pub struct SharedRcon {
    client: Rc<RefCell<RconClient>>,
}

impl SharedRcon {
    pub fn new(client: RconClient) -> Self {
        Self {
            client: Rc::new(RefCell::new(client)),
        }
    }
}

impl RemoteControl for SharedRcon {
    fn execute(&mut self, command: &str) -> Result<String, RconError> {
        self.client.borrow_mut().execute(command)
    }
}

impl MessageSink for SharedRcon {
    fn send(&mut self, text: &str) {
        if let Err(error) = self.client.borrow_mut().execute(&say_command(text)) {
            tracing::warn!(error = %error, "Failed to send chat message");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{MessageSink, RemoteControl};
    use crate::error::RconError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub(crate) messages: Vec<String>,
    }

    impl MessageSink for RecordingSink {
        fn send(&mut self, text: &str) {
            self.messages.push(text.to_string());
        }
    }

    /// Shared view of everything a test controller sent out.
    #[derive(Debug, Default, Clone)]
    pub(crate) struct Outbox {
        pub(crate) commands: Rc<RefCell<Vec<String>>>,
        pub(crate) messages: Rc<RefCell<Vec<String>>>,
        pub(crate) replies: Rc<RefCell<HashMap<String, String>>>,
        pub(crate) failing: Rc<RefCell<bool>>,
    }

    impl Outbox {
        pub(crate) fn commands(&self) -> Vec<String> {
            self.commands.borrow().clone()
        }

        pub(crate) fn messages(&self) -> Vec<String> {
            self.messages.borrow().clone()
        }

        pub(crate) fn reply_to(&self, command: &str, reply: &str) {
            self.replies
                .borrow_mut()
                .insert(command.to_string(), reply.to_string());
        }

        pub(crate) fn fail_all(&self) {
            *self.failing.borrow_mut() = true;
        }

        pub(crate) fn clear(&self) {
            self.commands.borrow_mut().clear();
            self.messages.borrow_mut().clear();
        }
    }

    impl RemoteControl for Outbox {
        fn execute(&mut self, command: &str) -> Result<String, RconError> {
            self.commands.borrow_mut().push(command.to_string());
            if *self.failing.borrow() {
                return Err(RconError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "server down",
                )));
            }
            Ok(self
                .replies
                .borrow()
                .get(command)
                .cloned()
                .unwrap_or_default())
        }
    }

    impl MessageSink for Outbox {
        fn send(&mut self, text: &str) {
            self.messages.borrow_mut().push(text.to_string());
        }
    }
}
