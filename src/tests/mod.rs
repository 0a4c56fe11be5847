mod config;
mod diagnostics;
mod events;
mod logs;
mod state;
