mod gateway;
mod handlers;
mod prompt;

pub use gateway::*;
pub use handlers::*;
pub use prompt::PaymentPrompt;
