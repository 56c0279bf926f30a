//! Blocking HTTP client for the remote mask service.

use std::io::Read;
use std::time::Duration;

use crate::error::{Error, Result};

use super::MaskService;
use super::wire::{ConfigureReply, GeneratorConfig, MaskInfo, MaskRequest};

pub struct HttpMaskService {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpMaskService {
    /// `timeout` bounds the whole request; `None` waits indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Push new generator parameters (`POST /configure_mask_generator`).
    /// Affects every fetch made after it returns.
    pub fn configure(&self, config: &GeneratorConfig) -> Result<()> {
        let reply: ConfigureReply = self
            .agent
            .post(&self.endpoint("configure_mask_generator"))
            .send_json(config)
            .map_err(request_error)?
            .into_json()
            .map_err(|e| Error::Decode(e.to_string()))?;
        if reply.msg == "success" {
            crate::log_info!("Mask generator reconfigured: {:?}", config);
            Ok(())
        } else {
            Err(Error::Request(format!("generator rejected configuration: {}", reply.msg)))
        }
    }
}

impl MaskService for HttpMaskService {
    fn fetch(&self, file_name: &str) -> Result<MaskInfo> {
        let response = self
            .agent
            .post(&self.endpoint("get_mask_info"))
            .send_json(MaskRequest { file_name: file_name.to_string() })
            .map_err(request_error)?;

        // into_string() caps bodies at 10MiB; full-image pixel lists exceed that
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| Error::Request(format!("reading response: {}", e)))?;
        MaskInfo::from_json(&body)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

fn request_error(e: ureq::Error) -> Error {
    match e {
        ureq::Error::Status(code, response) => {
            Error::Request(format!("HTTP {} {}", code, response.status_text()))
        }
        ureq::Error::Transport(transport) => Error::Request(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_cleanly() {
        let svc = HttpMaskService::new("http://10.1.1.1:12307/", None);
        assert_eq!(svc.endpoint("get_mask_info"), "http://10.1.1.1:12307/get_mask_info");
        assert_eq!(svc.describe(), "http://10.1.1.1:12307");
    }

    #[test]
    fn unreachable_service_is_a_request_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine
        let svc = HttpMaskService::new("http://127.0.0.1:9", Some(Duration::from_secs(2)));
        assert!(matches!(svc.fetch("a.png"), Err(Error::Request(_))));
    }
}
