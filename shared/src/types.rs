//! Instance identity used to tag every log line

use std::fmt;
use std::sync::OnceLock;

/// Global instance ID singleton - set once at startup
static INSTANCE_ID: OnceLock<InstanceId> = OnceLock::new();

/// Identity of one running service instance
///
/// Several instances usually run side by side behind a load balancer, so log
/// lines carry the service name, host and pid to tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    pub service: String,
    pub host: String,
    pub pid: u32,
}

impl InstanceId {
    /// Build an identity for the current process
    pub fn for_current_process(service: &str) -> Self {
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_string());

        Self {
            service: service.to_string(),
            host,
            pid: std::process::id(),
        }
    }

    /// Initialize the global instance ID; later calls return the first value
    pub fn init(service: &str) -> &'static InstanceId {
        INSTANCE_ID.get_or_init(|| Self::for_current_process(service))
    }

    /// Get the global instance ID, falling back to an anonymous identity
    pub fn current() -> &'static InstanceId {
        INSTANCE_ID.get_or_init(|| Self::for_current_process("unknown"))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.service, self.host, self.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_display() {
        let id = InstanceId {
            service: "envbin".to_string(),
            host: "node-1".to_string(),
            pid: 42,
        };

        assert_eq!(id.to_string(), "envbin@node-1:42");
    }

    #[test]
    fn test_instance_id_uses_current_pid() {
        let id = InstanceId::for_current_process("envbin");
        assert_eq!(id.pid, std::process::id());
        assert_eq!(id.service, "envbin");
        assert!(!id.host.is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = InstanceId::init("envbin");
        let second = InstanceId::init("other");
        assert_eq!(first, second);
        assert_eq!(InstanceId::current(), first);
    }
}
