//! Business logic between the HTTP handlers and the stores

pub mod review;
pub mod toy;
pub mod user;

pub use review::ReviewService;
pub use toy::{ToyDetail, ToyPage, ToyService, PAGE_SIZE};
pub use user::{NewUser, UserService};
