use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::net::UnixDatagram;
use tokio::sync::mpsc;

use crate::infra::BridgeError;
use crate::state::LocationRegistry;

const DATAGRAM_CAPACITY: usize = 1024;

/// One `(location, raw value)` update from the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub location: String,
    pub value: u32,
}

impl Delta {
    pub fn new(location: impl Into<String>, value: u32) -> Self {
        Self {
            location: location.into(),
            value,
        }
    }
}

/// Source of memory deltas.
///
/// `poll` suspends until at least one delta is available, then returns every
/// delta that is ready without waiting for more.
#[allow(async_fn_in_trait)]
pub trait DeltaTransport {
    async fn poll(&mut self) -> Result<Vec<Delta>, BridgeError>;
}

/// Message-queue transport backed by an in-process channel.
pub struct ChannelTransport {
    receiver: mpsc::UnboundedReceiver<Delta>,
}

impl ChannelTransport {
    pub fn new() -> (mpsc::UnboundedSender<Delta>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (sender, Self { receiver })
    }
}

impl DeltaTransport for ChannelTransport {
    async fn poll(&mut self) -> Result<Vec<Delta>, BridgeError> {
        let first = self
            .receiver
            .recv()
            .await
            .ok_or_else(|| BridgeError::TransportClosed {
                reason: "delta channel closed".to_string(),
            })?;

        let mut deltas = vec![first];
        while let Ok(delta) = self.receiver.try_recv() {
            deltas.push(delta);
        }
        Ok(deltas)
    }
}

/// Dolphin's MemoryWatcher socket: one `<location>\n<hex value>\n` datagram per change.
pub struct SocketTransport {
    socket: UnixDatagram,
    path: PathBuf,
    buffer: Vec<u8>,
}

impl SocketTransport {
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self, BridgeError> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .map_err(|e| BridgeError::io(format!("Creating {}", parent.display()), e))?;
        }
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| BridgeError::io(format!("Removing stale {}", path.display()), e))?;
        }

        let socket = UnixDatagram::bind(&path)
            .map_err(|e| BridgeError::io(format!("Binding {}", path.display()), e))?;
        tracing::info!("MemoryWatcher socket bound at {}", path.display());

        Ok(Self {
            socket,
            path,
            buffer: vec![0; DATAGRAM_CAPACITY],
        })
    }

    fn push_datagram(&self, len: usize, deltas: &mut Vec<Delta>) {
        match parse_datagram(&self.buffer[..len]) {
            Some(delta) => deltas.push(delta),
            None => tracing::warn!(
                "Dropping malformed MemoryWatcher datagram: {:?}",
                String::from_utf8_lossy(&self.buffer[..len])
            ),
        }
    }
}

impl DeltaTransport for SocketTransport {
    async fn poll(&mut self) -> Result<Vec<Delta>, BridgeError> {
        let len = self
            .socket
            .recv(&mut self.buffer)
            .await
            .map_err(|e| BridgeError::TransportClosed {
                reason: e.to_string(),
            })?;

        let mut deltas = Vec::new();
        self.push_datagram(len, &mut deltas);

        loop {
            match self.socket.try_recv(&mut self.buffer) {
                Ok(len) => self.push_datagram(len, &mut deltas),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    return Err(BridgeError::TransportClosed {
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(deltas)
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Parse a `<location>\n<hex value>\n` datagram, tolerating NUL padding.
pub fn parse_datagram(bytes: &[u8]) -> Option<Delta> {
    let text = std::str::from_utf8(bytes).ok()?;
    let text = text.trim_matches('\0');
    let mut lines = text.lines();

    let location = lines.next()?.trim();
    let value = lines.next()?.trim().trim_end_matches('\0');
    if location.is_empty() || value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    // Values wider than one word keep their leading (most significant) bytes
    let value = &value[..value.len().min(8)];
    let value = u32::from_str_radix(value, 16).ok()?;
    Some(Delta::new(location, value))
}

/// Export the registry, in registration order, to `MemoryWatcher/Locations.txt`.
pub fn write_locations(dolphin_dir: &Path, registry: &LocationRegistry) -> Result<PathBuf, BridgeError> {
    let dir = dolphin_dir.join("MemoryWatcher");
    fs::create_dir_all(&dir).map_err(|e| BridgeError::io(format!("Creating {}", dir.display()), e))?;

    let path = dir.join("Locations.txt");
    tracing::info!("Writing locations to: {}", path.display());

    let contents = registry.locations().collect::<Vec<_>>().join("\n");
    fs::write(&path, contents).map_err(|e| BridgeError::io(format!("Writing {}", path.display()), e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TRACKED_PORTS;

    #[test]
    fn test_parse_datagram() {
        let delta = parse_datagram(b"80479D60\n00000258\n\0\0\0").unwrap();
        assert_eq!(delta, Delta::new("80479D60", 600));

        let delta = parse_datagram(b"80453130 B0\nC22A0000\n").unwrap();
        assert_eq!(delta.location, "80453130 B0");
        assert_eq!(f32::from_bits(delta.value), -42.5);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_datagram(b"80479D60\n").is_none());
        assert!(parse_datagram(b"80479D60\nnothex\n").is_none());
        assert!(parse_datagram(&[0xff, 0xfe, b'\n']).is_none());
        // Multibyte character across the eight-digit cut
        assert!(parse_datagram("80479D60\n0000000\u{e9}\n".as_bytes()).is_none());
        assert!(parse_datagram("80479D60\n0000000A\u{e9}\n".as_bytes()).is_none());
    }

    #[tokio::test]
    async fn test_channel_poll_drains_everything_available() {
        let (sender, mut transport) = ChannelTransport::new();
        sender.send(Delta::new("a", 1)).unwrap();
        sender.send(Delta::new("b", 2)).unwrap();
        sender.send(Delta::new("a", 3)).unwrap();

        let deltas = transport.poll().await.unwrap();
        assert_eq!(
            deltas,
            vec![Delta::new("a", 1), Delta::new("b", 2), Delta::new("a", 3)]
        );
    }

    #[tokio::test]
    async fn test_channel_closed_is_reported() {
        let (sender, mut transport) = ChannelTransport::new();
        sender.send(Delta::new("a", 1)).unwrap();
        drop(sender);

        assert_eq!(transport.poll().await.unwrap().len(), 1);
        assert!(matches!(
            transport.poll().await,
            Err(BridgeError::TransportClosed { .. })
        ));
    }

    #[tokio::test]
    async fn test_socket_transport_receives_datagrams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MemoryWatcher").join("MemoryWatcher");
        let mut transport = SocketTransport::bind(&path).unwrap();

        let client = UnixDatagram::unbound().unwrap();
        client.send_to(b"80479D60\n0000000A\n", &path).await.unwrap();
        client.send_to(b"garbage", &path).await.unwrap();
        client.send_to(b"80479D30\n00000002\n", &path).await.unwrap();

        let mut deltas = transport.poll().await.unwrap();
        while deltas.len() < 2 {
            deltas.extend(transport.poll().await.unwrap());
        }
        assert_eq!(deltas[0], Delta::new("80479D60", 10));
        assert_eq!(deltas[1], Delta::new("80479D30", 2));
    }

    #[test]
    fn test_write_locations_matches_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LocationRegistry::new(&TRACKED_PORTS);

        let path = write_locations(dir.path(), &registry).unwrap();
        let written = fs::read_to_string(path).unwrap();
        let expected: Vec<&str> = registry.locations().collect();
        assert_eq!(written.lines().collect::<Vec<_>>(), expected);
    }
}
