/// Settings for a [`Chain`](crate::pipeline::chain::Chain).
#[derive(Debug, Clone)]
pub struct ChainConfig {
    name: &'static str,
    trace_items: bool,
}

impl ChainConfig {
    pub fn new() -> Self {
        Self {
            name: "chain",
            trace_items: false,
        }
    }

    /// Label used in tracing spans and `Debug` output.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Emit a `TRACE` event for every item handed to a stage.
    pub fn trace_items(mut self, enabled: bool) -> Self {
        self.trace_items = enabled;
        self
    }

    pub fn chain_name(&self) -> &'static str {
        self.name
    }

    pub fn traces_items(&self) -> bool {
        self.trace_items
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new()
    }
}
