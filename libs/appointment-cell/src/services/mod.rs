pub mod lifecycle;
pub mod request;

pub use lifecycle::AppointmentLifecycleService;
pub use request::AppointmentRequestService;
