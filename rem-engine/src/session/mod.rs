//! Session state, stage machine and the controller that owns them.

pub mod adjust;
pub mod controller;
pub mod driver;
pub mod scoring;
pub mod stage;
mod types;

pub use adjust::{AdjustableCurve, MAX_GAIN_DB, MIN_GAIN_DB};
pub use controller::{
    Blocked, Command, Dispatch, Effect, MeasurementTicket, SessionController, SetupSelection,
    StageView, View,
};
pub use driver::MeasurementDriver;
pub use scoring::{accuracy_against_target, FeedbackTier};
pub use stage::Stage;
pub use types::Session;
