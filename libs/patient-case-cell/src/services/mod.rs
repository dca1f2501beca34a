pub mod attachment;
pub mod case;

pub use attachment::AttachmentService;
pub use case::PatientCaseService;
