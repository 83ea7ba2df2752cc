use uuid::Uuid;

/// Where a pair of identities stands, seen from one side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    None,
    /// We sent a request and wait for the reply
    Sent { request_id: Uuid },
    /// The peer sent us a request, still encrypted
    Pending { request_id: Uuid },
    Connected,
}

/// Events that trigger state transitions in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    /// Sending a connection request to the peer.
    Send { request_id: Uuid },
    /// Receiving a connection request from the peer.
    Receive { request_id: Uuid },
    /// Accepting the peer's pending request.
    Accept,
    /// Receiving the peer's reply to our request.
    Establish,
    DeleteSent,
    DeletePending,
}

/// Errors that can occur during state transitions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("a request was already sent to this peer")]
    DuplicateRequest,
    #[error("the peer already sent us a request")]
    ExistingIncomingRequest,
    #[error("concurrency conflict: both parties requested a connection")]
    ConcurrencyConflict,
    #[error("invalid state transition from {from:?} with event {event:?}")]
    InvalidTransition {
        from: ConnectionState,
        event: RequestEvent,
    },
}

/// The state machine governing connection request transitions.
pub struct ConnectionMachine;

impl ConnectionMachine {
    /// Transition the state based on the current state and the incoming event.
    pub fn transition(
        current: &ConnectionState,
        event: RequestEvent,
    ) -> Result<ConnectionState, StateError> {
        use RequestEvent as E;
        use ConnectionState as S;

        match (*current, event) {
            // a connected peer that lost its state may start over
            (S::None | S::Connected, E::Send { request_id }) => Ok(S::Sent { request_id }),
            (S::None | S::Connected, E::Receive { request_id }) => Ok(S::Pending { request_id }),

            (S::Sent { .. }, E::Send { .. }) => Err(StateError::DuplicateRequest),
            (S::Sent { .. }, E::Receive { .. }) => Err(StateError::ConcurrencyConflict),
            (S::Sent { .. }, E::Establish) => Ok(S::Connected),
            (S::Sent { .. }, E::DeleteSent) => Ok(S::None),

            (S::Pending { .. }, E::Send { .. }) => Err(StateError::ExistingIncomingRequest),
            // the peer restarted the process, the newer request replaces the old one
            (S::Pending { .. }, E::Receive { request_id }) => Ok(S::Pending { request_id }),
            (S::Pending { .. }, E::Accept) => Ok(S::Connected),
            (S::Pending { .. }, E::DeletePending) => Ok(S::None),

            // deleting what is not there is a no-op
            (state, E::DeleteSent | E::DeletePending) => Ok(state),

            (state, event) => Err(StateError::InvalidTransition { from: state, event }),
        }
    }
}
