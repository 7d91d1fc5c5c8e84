mod agent;
pub use agent::Agent;

mod app;
pub use app::App;

mod config;
pub use config::Config;

mod ledger;
pub use ledger::Ledger;

mod parser;
pub use parser::Parser;
