pub mod accounts;
pub mod dispatcher;
pub mod engine;
pub mod ledger;
pub mod medications;
pub mod message;
pub mod scanner;
pub mod scheduler;
