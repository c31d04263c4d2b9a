pub mod coordinator;

pub use coordinator::{
    MediaBackend, MediaEvent, MediaFault, PlaybackCoordinator, PlayerPhase,
};
