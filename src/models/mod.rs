mod course;
mod payment;
mod user;

pub use course::*;
pub use payment::*;
pub use user::*;
