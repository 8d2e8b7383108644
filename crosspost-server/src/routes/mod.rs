mod cron;
mod health;
mod publish;

pub use cron::cron_publish_handler;
pub use health::health_handler;
pub use publish::manual_publish_handler;
