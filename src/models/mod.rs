pub mod notification;
pub mod response;
pub mod retry;
pub mod status;
pub mod validation;
