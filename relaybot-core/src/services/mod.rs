// File: src/services/mod.rs

pub mod builtin_commands;
pub mod command_handler;
pub mod command_registry;
pub mod dispatcher;
pub mod gate;
pub mod message_sender;
pub mod normalizers;
pub mod serializer;
pub mod system_strings;

pub use command_handler::{AsyncCommandHandler, CommandContext, CommandExecutor, SyncCommandHandler};
pub use command_registry::{CommandRegistry, RegisteredCommand, RegistryBuilder};
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder, PlatformEvent};
pub use gate::{DenyReason, GateDecision};
pub use serializer::ExecutionSerializer;
