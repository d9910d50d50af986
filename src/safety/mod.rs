//! Network egress safety for declarative tools.

mod allowlist;
mod egress;
mod resolver;

pub use allowlist::{HostAllowlist, HostPattern};
pub use egress::{EgressDenial, check_egress, is_blocked_hostname, is_blocked_ip};
pub use resolver::{BlockedResolution, GuardedResolver, screen_addrs};
