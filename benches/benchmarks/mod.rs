pub mod login;
pub mod tier;
