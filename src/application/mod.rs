//! Application services: the decision engine and its collaborators.

pub mod access_engine;
pub mod device_status;
pub mod notification_fanout;
pub mod qr_lifecycle;
pub mod qr_sweeper;
pub mod throttle;

pub use access_engine::{AccessDecisionEngine, OpenGateRequest, OpenGateResult};
pub use device_status::DeviceStatusTracker;
pub use notification_fanout::{FanoutFailure, FanoutJob, FanoutScope, FanoutWorker, NotificationFanout};
pub use qr_lifecycle::{QrLifecycle, RedeemOutcome};
pub use qr_sweeper::QrSweeper;
pub use throttle::{CooldownThrottle, ThrottleDecision};
