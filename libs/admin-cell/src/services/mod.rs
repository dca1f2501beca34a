pub mod overview;

pub use overview::AdminOverviewService;
