//! HAProxy HTTP log lines.
//!
//! Body fields sit at fixed token positions:
//!
//! ```text
//! 5  frontend               http-in
//! 6  backend/host:img:cid   app/app1:4f2a:9bc1
//! 7  Tq/Tw/Tc/Tr/Tt         0/1/2/3/4
//! 8  status                 200
//! 9  bytes                  1234
//! 13 act/fe/be/srv/retries  10/9/8/7/6
//! 14 srv_queue/be_queue     1/2
//! 15 "METHOD                "GET
//! 16 uri                    /path
//! ```

use crate::envelope::SyslogLine;
use crate::models::LineFormat;
use crate::parsers::{int_or_zero, LineParser};
use serde::Serialize;

/// Program name of the load balancer
pub const HAPROXY_TAG: &str = "haproxy";

/// Lines with this many tokens or fewer carry no usable body
const MIN_FIELDS: usize = 16;

/// Load balancer request line
#[derive(Debug, Clone, Default, Serialize)]
pub struct HAProxyLine {
    #[serde(flatten)]
    pub line: SyslogLine,
    pub frontend: String,
    pub backend: String,
    pub backend_host: String,
    pub backend_image_id: String,
    pub backend_container_id: String,
    pub status: String,
    pub length: i64,
    pub client_request_time: i64,
    pub connection_queue_time: i64,
    pub tcp_connect_time: i64,
    pub server_response_time: i64,
    pub session_duration_time: i64,
    pub active_connections: i64,
    pub frontend_connections: i64,
    pub backend_connections: i64,
    pub server_connections: i64,
    pub retries: i64,
    pub server_queue: i64,
    pub backend_queue: i64,
    pub method: String,
    pub uri: String,
}

/// Split `raw` on `/` and parse exactly `N` integers; `None` on any other shape
fn slash_ints<const N: usize>(raw: &str) -> Option<[i64; N]> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != N {
        tracing::trace!(raw, expected = N, "unexpected positional field shape");
        return None;
    }
    let mut out = [0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = int_or_zero(part);
    }
    Some(out)
}

/// Topology parts of `backend/host:image:container`.
///
/// `None` without a `/`. Host, image and container are only filled when the
/// server part has exactly three `:` parts.
fn parse_backend(raw: &str) -> Option<(&str, Option<[&str; 3]>)> {
    let (backend, server) = raw.split_once('/')?;
    let parts: Vec<&str> = server.split(':').collect();
    let server = match parts.as_slice() {
        [host, image, container] => Some([*host, *image, *container]),
        _ => None,
    };
    Some((backend, server))
}

impl LineParser for HAProxyLine {
    const FORMAT: LineFormat = LineFormat::HAProxy;

    fn envelope(&self) -> &SyslogLine {
        &self.line
    }

    fn envelope_mut(&mut self) -> &mut SyslogLine {
        &mut self.line
    }

    fn supports_tag(tag: &str) -> bool {
        tag == HAPROXY_TAG
    }

    fn parse_body(&mut self) {
        if self.line.fields().len() <= MIN_FIELDS {
            return;
        }
        let fields = self.line.fields();

        self.frontend = fields[5].clone();
        if let Some((backend, server)) = parse_backend(&fields[6]) {
            self.backend = backend.to_string();
            if let Some([host, image, container]) = server {
                self.backend_host = host.to_string();
                self.backend_image_id = image.to_string();
                self.backend_container_id = container.to_string();
            }
        }

        if let Some([request, queue, connect, response, session]) = slash_ints::<5>(&fields[7]) {
            self.client_request_time = request;
            self.connection_queue_time = queue;
            self.tcp_connect_time = connect;
            self.server_response_time = response;
            self.session_duration_time = session;
        }

        self.status = fields[8].clone();
        self.length = int_or_zero(&fields[9]);

        if let Some([active, frontend, backend, server, retries]) = slash_ints::<5>(&fields[13]) {
            self.active_connections = active;
            self.frontend_connections = frontend;
            self.backend_connections = backend;
            self.server_connections = server;
            self.retries = retries;
        }

        if let Some([server, backend]) = slash_ints::<2>(&fields[14]) {
            self.server_queue = server;
            self.backend_queue = backend;
        }

        let mut method = fields[15].chars();
        method.next();
        self.method = method.as_str().to_string();
        self.uri = fields[16].clone();
    }
}
