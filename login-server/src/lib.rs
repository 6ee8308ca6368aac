pub mod auth;
pub mod daily_limit;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod gateway_tier;
pub mod kickout;
pub mod login_impl;
pub mod maintenance;
pub mod metrics;
pub mod queue;
pub mod recommend;
pub mod score;
pub mod store;
pub mod util;
pub mod wait_level;
pub mod window;
pub mod world_tracker;
pub mod zone;

pub use dispatcher::{Collaborators, Dispatcher};
pub use error::{LoginError, LoginResult};
