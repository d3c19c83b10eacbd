pub mod command;
pub mod controller;
pub mod driver;
pub mod engine;
pub mod evaluation;
pub mod timers;
pub mod training;
