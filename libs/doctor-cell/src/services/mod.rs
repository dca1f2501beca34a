pub mod doctor;
pub mod listing;

pub use doctor::DoctorService;
pub use listing::DoctorListingService;
