// Agent registry and broadcast loop

mod broadcaster;
mod registry;

pub use broadcaster::{AgentBroadcast, Broadcaster};
pub use registry::AgentRegistry;

#[cfg(test)]
mod tests;
