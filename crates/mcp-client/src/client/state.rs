use std::fmt;

/// Lifecycle of the client's single connection.
///
/// `disconnected -> connecting -> connected -> closing -> disconnected`.
/// `Connecting` and `Closing` are transient; any inbound transport failure
/// while connected drops straight back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
        })
    }
}

/// The state plus the id of the connection it belongs to. The epoch changes
/// on every connect so that a read loop from an earlier connection cannot
/// tear down a newer one.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub(crate) state: ConnectionState,
    pub(crate) epoch: u64,
}

impl Lifecycle {
    /// Move from `Disconnected` to `Connecting`, returning the new epoch.
    pub(crate) fn begin_connect(&mut self) -> Option<u64> {
        if self.state != ConnectionState::Disconnected {
            return None;
        }
        self.state = ConnectionState::Connecting;
        self.epoch += 1;
        Some(self.epoch)
    }

    /// Whether `epoch` is still the live connection and in `state`.
    pub(crate) fn is(&self, epoch: u64, state: ConnectionState) -> bool {
        self.epoch == epoch && self.state == state
    }
}
