pub mod host_link;
pub mod multicast;

pub use host_link::HostLink;
pub use multicast::MulticastTransport;
