pub mod conversations;
pub mod health;
pub mod reports;
pub mod symptoms;
pub mod users;
