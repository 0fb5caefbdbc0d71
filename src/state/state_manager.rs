use crate::infra::{BridgeError, Delta, DeltaTransport};
use crate::state::{Field, GameState, LocationRegistry};

/// What one drain did to the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub applied: usize,
    /// The frame counter location was among the applied deltas
    pub frame_updated: bool,
}

/// Applies memory deltas to the snapshot through the location registry.
///
/// There is no notion of a complete frame here: each drain applies whatever
/// the transport has ready, in arrival order.
pub struct StateManager {
    registry: LocationRegistry,
}

impl StateManager {
    pub fn new(registry: LocationRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    /// Wait for the transport, then apply every available delta.
    pub async fn drain<T: DeltaTransport>(
        &self,
        transport: &mut T,
        state: &mut GameState,
    ) -> Result<Drained, BridgeError> {
        let deltas = transport.poll().await?;
        self.apply_all(state, &deltas)
    }

    #[tracing::instrument(level = "trace", skip(self, state, deltas), fields(count = deltas.len()))]
    pub fn apply_all(&self, state: &mut GameState, deltas: &[Delta]) -> Result<Drained, BridgeError> {
        let mut drained = Drained::default();
        for delta in deltas {
            let field = self.registry.apply(state, &delta.location, delta.value)?;
            drained.frame_updated |= field == Field::Frame;
            drained.applied += 1;
        }
        Ok(drained)
    }
}
