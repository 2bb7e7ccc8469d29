/// The UI's user-control switch. Disabled while a render cycle is in flight.
pub trait InputGate: Send {
    fn enable(&mut self);
    fn disable(&mut self);
    fn is_enabled(&self) -> bool;
}

/// Headless gate: remembers its state and logs changes.
#[derive(Debug, Default)]
pub struct LoggingGate {
    enabled: bool,
}

impl LoggingGate {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputGate for LoggingGate {
    fn enable(&mut self) {
        if !self.enabled {
            tracing::debug!("user controls enabled");
        }
        self.enabled = true;
    }

    fn disable(&mut self) {
        if self.enabled {
            tracing::debug!("user controls disabled");
        }
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
