// EnvStation — Telemetry Encoding & Transport
//
// One JSON document per sample, wrapped in a single HTTP/1.1 POST sent over a
// fresh TCP connection.  Both the payload and the request are built in
// fixed-capacity buffers.

use core::fmt::{self, Write as _};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::*;
use crate::events::Sample;

pub type Payload = heapless::String<PAYLOAD_CAPACITY>;
pub type Request = heapless::String<REQUEST_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeError;

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("encoded telemetry exceeds buffer")
    }
}

impl std::error::Error for EncodeError {}

impl From<fmt::Error> for EncodeError {
    fn from(_: fmt::Error) -> Self {
        EncodeError
    }
}

/// Two decimals, or `null` for values JSON cannot carry.
struct JsonFloat(f32);

impl fmt::Display for JsonFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.2}", self.0)
        } else {
            f.write_str("null")
        }
    }
}

/// `{"lux":F,"temp":F,"rssi":I,"uptime":U,"accel":{"x":I,"y":I,"z":I}}`
pub fn encode_payload(sample: &Sample) -> Result<Payload, EncodeError> {
    let mut out = Payload::new();
    write!(
        out,
        "{{\"lux\":{},\"temp\":{},\"rssi\":{},\"uptime\":{},\"accel\":{{\"x\":{},\"y\":{},\"z\":{}}}}}",
        JsonFloat(sample.lux),
        JsonFloat(sample.temp_c),
        sample.rssi,
        sample.uptime_s,
        sample.accel.x,
        sample.accel.y,
        sample.accel.z,
    )?;
    Ok(out)
}

/// Where samples are posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collector<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl Collector<'static> {
    /// The collector baked in at build time.
    pub fn from_build_env() -> Self {
        Self {
            host: COLLECTOR_HOST,
            port: COLLECTOR_PORT.parse().unwrap_or(COLLECTOR_DEFAULT_PORT),
            path: COLLECTOR_PATH,
        }
    }
}

pub fn build_request(collector: &Collector<'_>, payload: &str) -> Result<Request, EncodeError> {
    let mut out = Request::new();
    write!(
        out,
        "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        collector.path,
        collector.host,
        payload.len(),
        payload,
    )?;
    Ok(out)
}

/// Opens one connection to the collector.
pub trait Connector {
    type Conn: Read + Write;

    fn connect(&mut self, collector: &Collector<'_>) -> io::Result<Self::Conn>;
}

/// Plain TCP with bounded connect and I/O timeouts.  On ESP-IDF the std
/// socket calls go straight to lwIP.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self {
            connect_timeout: NET_CONNECT_TIMEOUT,
            io_timeout: NET_IO_TIMEOUT,
        }
    }
}

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(&mut self, collector: &Collector<'_>) -> io::Result<TcpStream> {
        let addr = (collector.host, collector.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "collector host did not resolve"))?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Acceleration;
    use std::net::TcpListener;
    use std::thread;

    fn sample() -> Sample {
        Sample {
            lux: 1000.0,
            accel: Acceleration { x: 258, y: 772, z: -1286 },
            temp_c: 31.456,
            rssi: -61,
            uptime_s: 42,
        }
    }

    #[test]
    fn payload_keys_in_fixed_order() {
        let payload = encode_payload(&sample()).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"lux":1000.00,"temp":31.46,"rssi":-61,"uptime":42,"accel":{"x":258,"y":772,"z":-1286}}"#
        );
    }

    #[test]
    fn unreadable_temperature_encodes_as_null() {
        let payload = encode_payload(&Sample {
            temp_c: f32::NAN,
            ..Default::default()
        })
        .unwrap();
        assert!(payload.starts_with(r#"{"lux":0.00,"temp":null,"rssi":0,"#));
    }

    #[test]
    fn request_envelope_carries_exact_length() {
        let collector = Collector {
            host: "192.168.1.11",
            port: 5001,
            path: "/submit_data",
        };
        let payload = encode_payload(&sample()).unwrap();
        let request = build_request(&collector, &payload).unwrap();

        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert_eq!(body, payload.as_str());
        let mut lines = head.split("\r\n");
        assert_eq!(lines.next(), Some("POST /submit_data HTTP/1.1"));
        assert_eq!(lines.next(), Some("Host: 192.168.1.11"));
        assert_eq!(lines.next(), Some("Content-Type: application/json"));
        assert_eq!(lines.next(), Some(format!("Content-Length: {}", payload.len()).as_str()));
        assert_eq!(lines.next(), Some("Connection: close"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let path = "/".repeat(REQUEST_CAPACITY);
        let collector = Collector {
            host: "h",
            port: 1,
            path: &path,
        };
        assert_eq!(build_request(&collector, "{}"), Err(EncodeError));
    }

    #[test]
    fn tcp_connector_reaches_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4];
            conn.read_exact(&mut buf).unwrap();
            conn.write_all(b"pong").unwrap();
            buf
        });

        let collector = Collector {
            host: "127.0.0.1",
            port,
            path: "/",
        };
        let mut conn = TcpConnector::default().connect(&collector).unwrap();
        conn.write_all(b"ping").unwrap();
        let mut reply = [0u8; 4];
        conn.read_exact(&mut reply).unwrap();

        assert_eq!(&reply, b"pong");
        assert_eq!(&server.join().unwrap(), b"ping");
    }

    #[test]
    fn tcp_connector_reports_refused_connection() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let collector = Collector {
            host: "127.0.0.1",
            port,
            path: "/",
        };
        assert!(TcpConnector::default().connect(&collector).is_err());
    }
}
