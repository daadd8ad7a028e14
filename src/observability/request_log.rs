//! Inbound request dumps.
//!
//! # Responsibilities
//! - Capture method, target, headers and body of every request
//! - Write them as raw HTTP bytes or JSON to stdout or a file
//!
//! # Design Decisions
//! - One writer shared by all request tasks, serialized by a mutex
//! - A failed write is logged and never affects the response

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use axum::http::request::Parts;
use serde::Serialize;

use crate::config::{RequestLogConfig, RequestLogFormat};

/// A captured inbound request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    pub method: String,
    pub uri: String,
    pub version: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,

    // Untouched bytes for the raw dump.
    #[serde(skip)]
    raw_headers: BTreeMap<String, Vec<Vec<u8>>>,
    #[serde(skip)]
    raw_body: Vec<u8>,
}

impl RecordedRequest {
    pub fn capture(parts: &Parts, body: &[u8], remote_addr: Option<SocketAddr>) -> Self {
        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut raw_headers: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
            raw_headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.as_bytes().to_vec());
        }

        Self {
            remote_addr: remote_addr.map(|a| a.to_string()),
            method: parts.method.to_string(),
            uri: parts.uri.to_string(),
            version: format!("{:?}", parts.version),
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
            raw_headers,
            raw_body: body.to_vec(),
        }
    }

    /// Render as HTTP/1.x wire bytes; header values and body are not re-encoded.
    pub fn to_raw(&self) -> Vec<u8> {
        let mut out = format!("{} {} {}\r\n", self.method, self.uri, self.version).into_bytes();
        for (name, values) in &self.raw_headers {
            for value in values {
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
            }
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.raw_body);
        out.push(b'\n');
        out
    }
}

/// Writes captured requests to a shared output.
pub struct RequestRecorder {
    format: RequestLogFormat,
    out: Mutex<Box<dyn Write + Send>>,
}

impl RequestRecorder {
    pub fn new(format: RequestLogFormat, out: Box<dyn Write + Send>) -> Self {
        Self {
            format,
            out: Mutex::new(out),
        }
    }

    /// Open the configured destination; `None` when dumping is off.
    pub fn from_config(config: &RequestLogConfig) -> io::Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let out: Box<dyn Write + Send> = match &config.output {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                tracing::info!(path = %path.display(), format = ?config.format, "Dumping requests to file");
                Box::new(file)
            }
            None => {
                tracing::info!(format = ?config.format, "Dumping requests to stdout");
                Box::new(io::stdout())
            }
        };

        Ok(Some(Self::new(config.format, out)))
    }

    pub fn format(&self) -> RequestLogFormat {
        self.format
    }

    /// Render and write one request.
    pub fn record(&self, request: &RecordedRequest) {
        let rendered = match self.render(request) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize request");
                return;
            }
        };

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(&rendered).and_then(|_| out.flush()) {
            tracing::error!(error = %e, "Failed to write request dump");
        }
    }

    fn render(&self, request: &RecordedRequest) -> serde_json::Result<Vec<u8>> {
        let mut rendered = match self.format {
            RequestLogFormat::Raw => return Ok(request.to_raw()),
            RequestLogFormat::Json => serde_json::to_vec(request)?,
            RequestLogFormat::PrettyJson => serde_json::to_vec_pretty(request)?,
        };
        rendered.push(b'\n');
        Ok(rendered)
    }
}
