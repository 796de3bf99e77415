use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::model::UploadResult;

/// One capture loaded on the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    instance: Uuid,
    key: String,
    total_packets: u64,
    filename: String,
    format: Option<String>,
    loaded_at: DateTime<Utc>,
}

impl Session {
    pub fn from_upload(upload: UploadResult, filename: &str) -> Self {
        // Prefer the name the server recorded, it is what the key is derived from
        let filename = if upload.filename.is_empty() {
            filename.to_string()
        } else {
            upload.filename
        };

        Self {
            instance: Uuid::new_v4(),
            key: upload.session_key,
            total_packets: upload.packet_count,
            filename,
            format: upload.format,
            loaded_at: Utc::now(),
        }
    }

    /// Client-side identity of this load; two uploads of the same file get
    /// the same backend key but different instances.
    pub fn instance(&self) -> Uuid {
        self.instance
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// `capture.pcap [PCAP]  ·  1,234 packets`
    pub fn caption(&self) -> String {
        let fmt = self
            .format
            .as_deref()
            .map(|f| format!(" [{}]", f.to_uppercase()))
            .unwrap_or_default();
        format!(
            "{}{}  ·  {} packets",
            self.filename,
            fmt,
            group_thousands(self.total_packets)
        )
    }
}

#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any live session with the one described by `upload`.
    pub fn start(&mut self, upload: UploadResult, filename: &str) -> &Session {
        let session = Session::from_upload(upload, filename);
        info!(
            "Session started: key={} packets={} instance={}",
            session.key, session.total_packets, session.instance
        );
        self.current.insert(session)
    }

    pub fn end(&mut self) -> Option<Session> {
        let ended = self.current.take();
        if let Some(ref s) = ended {
            info!("Session ended: key={} instance={}", s.key, s.instance);
        }
        ended
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Backend session key, or `""` when nothing is loaded.
    pub fn key(&self) -> &str {
        self.current.as_ref().map(|s| s.key()).unwrap_or("")
    }

    pub fn instance(&self) -> Option<Uuid> {
        self.current.as_ref().map(|s| s.instance)
    }

    pub fn total_packets(&self) -> u64 {
        self.current.as_ref().map(|s| s.total_packets).unwrap_or(0)
    }
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
